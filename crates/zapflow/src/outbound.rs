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
use serde_json::Value;
use tracing::{debug, error, warn};
use zapflow_common::event::{EventEnvelope, EventKind};

use crate::db;

fn format_and_transfer(url: &str, envelope: &EventEnvelope) {
    let mut request = ureq::post(url);

    request = request
        .set("Accept", "application/json")
        .set("Content-Type", "application/json");

    let response = request.send_json(envelope);

    if let Err(err) = response {
        error!("webhook delivery to {} failed: {}", url, err.to_string());
    }
}

/// Fan an event out to every active subscription for it. Delivery is
/// fire-and-forget: a failed POST is logged and dropped, never retried.
pub async fn dispatch(event: EventKind, data: Value, db: &DatabaseConnection) {
    let hooks = match db::webhook::list_active_by_event(event, db).await {
        Ok(hooks) => hooks,
        Err(err) => {
            error!("webhook lookup failed: {}", err);
            return;
        }
    };

    if hooks.is_empty() {
        return;
    }

    debug!(event = event.as_str(), "dispatching to {} webhook(s)", hooks.len());
    let envelope = EventEnvelope::new(event, data);

    for hook in hooks {
        if let Err(err) = db::webhook::touch_last_called(&hook.id, db).await {
            warn!("failed to stamp webhook {}: {}", hook.id, err);
        }
        format_and_transfer(&hook.url, &envelope);
    }
}
