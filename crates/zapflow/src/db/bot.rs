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
    name: &str,
    phone_number: &str,
    db: &DatabaseConnection,
) -> Result<bot::Model, ZapflowError> {
    let model = bot::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        user_id: ActiveValue::Set(user_id.to_owned()),
        name: ActiveValue::Set(name.to_owned()),
        phone_number: ActiveValue::Set(phone_number.to_owned()),
        active: ActiveValue::Set(true),
        ..Default::default()
    };

    let entry = model.insert(db).await?;
    Ok(entry)
}

pub async fn list(
    user_id: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<bot::Model>, ZapflowError> {
    let mut query = Bot::find().order_by(bot::Column::CreatedAt, Order::Desc);
    if let Some(user_id) = user_id {
        query = query.filter(bot::Column::UserId.eq(user_id));
    }

    let entries = query.limit(limit).offset(offset).all(db).await?;
    Ok(entries)
}

pub async fn get_by_id(id: &str, db: &DatabaseConnection) -> Result<Option<bot::Model>, ZapflowError> {
    let entry = Bot::find_by_id(id).one(db).await?;
    Ok(entry)
}

pub async fn get_active_by_phone_number(
    phone_number: &str,
    db: &DatabaseConnection,
) -> Result<Option<bot::Model>, ZapflowError> {
    let entry = Bot::find()
        .filter(bot::Column::PhoneNumber.eq(phone_number))
        .filter(bot::Column::Active.eq(true))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn set_active(id: &str, active: bool, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    let entry = Bot::find_by_id(id).one(db).await?;
    match entry {
        Some(e) => {
            let mut e: bot::ActiveModel = e.into();
            e.active = ActiveValue::Set(active);
            e.update(db).await?;
            Ok(())
        }
        None => Ok(()),
    }
}

/// Deleting a bot takes its flows, states, messages and credentials with it.
pub async fn delete_by_id(id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    super::flow::delete_by_bot_id(id, db).await?;
    super::flow_state::delete_by_bot_id(id, db).await?;
    super::message::delete_by_bot_id(id, db).await?;
    super::whatsapp_token::delete_by_bot_id(id, db).await?;
    Bot::delete_by_id(id).exec(db).await?;
    Ok(())
}
