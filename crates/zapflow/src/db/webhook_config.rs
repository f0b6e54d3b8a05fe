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

use sea_orm::*;
use uuid;

use super::entities::{prelude::*, *};
use crate::error::ZapflowError;

pub async fn create(
    user_id: &str,
    token: &str,
    db: &DatabaseConnection,
) -> Result<webhook_config::Model, ZapflowError> {
    let model = webhook_config::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        user_id: ActiveValue::Set(user_id.to_owned()),
        token: ActiveValue::Set(token.to_owned()),
        ..Default::default()
    };

    let entry = model.insert(db).await?;
    Ok(entry)
}

pub async fn get_by_token(
    token: &str,
    db: &DatabaseConnection,
) -> Result<Option<webhook_config::Model>, ZapflowError> {
    let entry = WebhookConfig::find()
        .filter(webhook_config::Column::Token.eq(token))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn list(
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<webhook_config::Model>, ZapflowError> {
    let entries = WebhookConfig::find()
        .order_by(webhook_config::Column::CreatedAt, Order::Desc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn delete_by_id(id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    WebhookConfig::delete_by_id(id).exec(db).await?;
    Ok(())
}
