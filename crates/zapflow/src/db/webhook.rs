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

use chrono::Utc;
use sea_orm::*;
use uuid;
use zapflow_common::event::EventKind;

use super::entities::{prelude::*, *};
use crate::error::ZapflowError;

pub async fn create(
    user_id: &str,
    url: &str,
    on_event: EventKind,
    db: &DatabaseConnection,
) -> Result<webhook::Model, ZapflowError> {
    let model = webhook::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        user_id: ActiveValue::Set(user_id.to_owned()),
        url: ActiveValue::Set(url.to_owned()),
        on_event: ActiveValue::Set(on_event.as_str().to_owned()),
        active: ActiveValue::Set(true),
        last_called_at: ActiveValue::Set(None),
        ..Default::default()
    };

    let entry = model.insert(db).await?;
    Ok(entry)
}

pub async fn list(
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<webhook::Model>, ZapflowError> {
    let entries = Webhook::find()
        .order_by(webhook::Column::CreatedAt, Order::Desc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn list_active_by_event(
    on_event: EventKind,
    db: &DatabaseConnection,
) -> Result<Vec<webhook::Model>, ZapflowError> {
    let entries = Webhook::find()
        .filter(webhook::Column::OnEvent.eq(on_event.as_str()))
        .filter(webhook::Column::Active.eq(true))
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn touch_last_called(id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    let entry = Webhook::find_by_id(id).one(db).await?;
    match entry {
        Some(e) => {
            let mut e: webhook::ActiveModel = e.into();
            e.last_called_at = ActiveValue::Set(Some(Utc::now().naive_utc().to_string()));
            e.update(db).await?;
            Ok(())
        }
        None => Ok(()),
    }
}

pub async fn delete_by_id(id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    Webhook::delete_by_id(id).exec(db).await?;
    Ok(())
}
