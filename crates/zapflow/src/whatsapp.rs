// Zapflow
// Copyright (C) 2025 Zapflow contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use sea_orm::DatabaseConnection;
use tracing::{debug, error};

use crate::db;
use crate::db::entities::{bot, message};
use crate::error::ZapflowError;
use crate::settings::Settings;

fn push_to_graph(
    url: &str,
    access_token: &str,
    to: &str,
    content: &str,
) -> Result<(), Box<ureq::Error>> {
    ureq::post(url)
        .set("Authorization", &format!("Bearer {}", access_token))
        .set("Content-Type", "application/json")
        .send_json(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": content }
        }))?;
    Ok(())
}

/// Record an outbound text reply and push it through the Cloud API when the
/// bot has credentials. Without credentials the row stays `pending`.
pub async fn send_text(
    bot: &bot::Model,
    to: &str,
    content: &str,
    settings: &Settings,
    db: &DatabaseConnection,
) -> Result<message::Model, ZapflowError> {
    let entry = db::message::create(
        &bot.id,
        &bot.phone_number,
        to,
        content,
        "text",
        "SEND",
        "pending",
        db,
    )
    .await?;

    let Some(token) = db::whatsapp_token::get_by_bot_id(&bot.id, db).await? else {
        debug!(
            bot_id = bot.id.to_string(),
            "no whatsapp credentials, reply stored as pending"
        );
        return Ok(entry);
    };

    let url = format!(
        "{}/{}/messages",
        settings.graph_api_base.trim_end_matches('/'),
        token.phone_number_id
    );

    let status = match push_to_graph(&url, &token.access_token, to, content) {
        Ok(()) => "sent",
        Err(err) => {
            error!(
                bot_id = bot.id.to_string(),
                "graph api send failed: {}",
                err.to_string()
            );
            "failed"
        }
    };

    db::message::set_status(&entry.id, status, db).await
}
