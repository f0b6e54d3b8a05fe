use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ZapflowError;

/// Runtime configuration merged from defaults, an optional TOML file and
/// `ZAPFLOW_`-prefixed environment variables (later sources win).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// HMAC key for Cloud API webhook signatures.
    pub app_secret: Option<String>,
    /// Expected token for the Cloud API subscription handshake.
    pub verify_token: Option<String>,
    /// Base URL for outbound Graph API calls.
    pub graph_api_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            app_secret: None,
            verify_token: None,
            graph_api_base: "https://graph.facebook.com/v18.0".to_owned(),
        }
    }
}

impl Settings {
    pub fn load(config: Option<&Path>) -> Result<Self, ZapflowError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config {
            figment = figment.merge(Toml::file(path));
        }
        let settings = figment.merge(Env::prefixed("ZAPFLOW_")).extract()?;
        Ok(settings)
    }
}
