use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use clap::Args;
use clap_verbosity_flag::Verbosity;
use sea_orm::Database;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_log::AsTrace;

use crate::api::{self, ApiState};
use crate::db;
use crate::error::ZapflowError;
use crate::flow::ConversationLocks;
use crate::ingress;
use crate::settings::Settings;

#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// API authentication token
    #[arg(short, long)]
    auth: String,

    /// IP address and port to bind to
    #[arg(short, long)]
    bind: String,

    /// Path to sqlite database file
    #[arg(short, long)]
    database: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

async fn authenticate(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    match auth_header {
        Some(auth_header) if auth_header == state.auth => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// The two ingress endpoints authenticate with their own token/signature
/// schemes and sit outside the bearer-auth layer.
pub fn router(state: ApiState) -> Router {
    let managed = Router::new()
        .route("/api/v1/bots", post(api::post_bot).get(api::list_bots))
        .route(
            "/api/v1/bots/{id}",
            get(api::get_bot).delete(api::delete_bot),
        )
        .route(
            "/api/v1/bots/{id}/flows",
            post(api::post_flow).get(api::list_flows),
        )
        .route(
            "/api/v1/bots/{id}/whatsapp-token",
            put(api::put_whatsapp_token).delete(api::delete_whatsapp_token),
        )
        .route(
            "/api/v1/flows/{id}",
            get(api::get_flow).delete(api::delete_flow),
        )
        .route("/api/v1/flows/{id}/activate", post(api::activate_flow))
        .route("/api/v1/flows/{id}/logs", get(api::get_flow_logs))
        .route("/api/v1/messages", get(api::get_messages))
        .route(
            "/api/v1/states",
            get(api::get_state).delete(api::delete_state),
        )
        .route(
            "/api/v1/webhook-configs",
            post(api::post_webhook_config).get(api::list_webhook_configs),
        )
        .route(
            "/api/v1/webhook-configs/{id}",
            axum::routing::delete(api::delete_webhook_config),
        )
        .route(
            "/api/v1/webhooks",
            post(api::post_webhook).get(api::list_webhooks),
        )
        .route(
            "/api/v1/webhooks/{id}",
            axum::routing::delete(api::delete_webhook),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/webhook", post(ingress::receive))
        .route(
            "/webhook/cloud",
            post(ingress::receive_cloud).get(ingress::verify_cloud),
        )
        .merge(managed)
        .with_state(state)
}

pub async fn init_server(server: ServerArgs) -> Result<(), ZapflowError> {
    tracing_subscriber::fmt()
        .with_max_level(server.verbose.log_level_filter().as_trace())
        .init();

    let settings = Settings::load(server.config.as_deref())?;

    let uri = format!("sqlite://{}?mode=rwc", server.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let state = ApiState {
        db,
        auth: server.auth,
        settings,
        locks: ConversationLocks::default(),
    };

    let app = router(state);

    let addr: SocketAddr = server.bind.parse().expect("Unable to parse bind address");
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod test_auth {
    use crate::utils::get_test_state;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;

    use super::*;

    #[tokio::test]
    async fn it_should_guard_the_management_api() {
        let state = get_test_state().await;
        let server = TestServer::new(router(state)).unwrap();

        server
            .get("/api/v1/bots")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .get("/api/v1/bots")
            .add_header(
                HeaderName::from_static("authorization"),
                HeaderValue::from_static("test"),
            )
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn it_should_leave_the_ingress_open() {
        let state = get_test_state().await;
        let server = TestServer::new(router(state)).unwrap();

        // no bearer header: the ingress falls through to its own token check
        server
            .post("/webhook")
            .json(&serde_json::json!({ "from": "a", "to": "b", "content": "c" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .get("/webhook/cloud")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
