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

#[allow(clippy::too_many_arguments)]
pub async fn create(
    bot_id: &str,
    from_number: &str,
    to_number: &str,
    content: &str,
    content_type: &str,
    direction: &str,
    status: &str,
    db: &DatabaseConnection,
) -> Result<message::Model, ZapflowError> {
    let model = message::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        bot_id: ActiveValue::Set(bot_id.to_owned()),
        from_number: ActiveValue::Set(from_number.to_owned()),
        to_number: ActiveValue::Set(to_number.to_owned()),
        content: ActiveValue::Set(content.to_owned()),
        content_type: ActiveValue::Set(content_type.to_owned()),
        direction: ActiveValue::Set(direction.to_owned()),
        status: ActiveValue::Set(status.to_owned()),
        ..Default::default()
    };

    let entry = model.insert(db).await?;
    Ok(entry)
}

pub async fn set_status(
    id: &str,
    status: &str,
    db: &DatabaseConnection,
) -> Result<message::Model, ZapflowError> {
    let Some(entry) = Message::find_by_id(id).one(db).await? else {
        return Err(ZapflowError::NotFound(format!("message {}", id)));
    };

    let mut entry: message::ActiveModel = entry.into();
    entry.status = ActiveValue::Set(status.to_owned());
    let updated = entry.update(db).await?;
    Ok(updated)
}

pub async fn get_by_bot_id(
    bot_id: &str,
    user_number: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<message::Model>, ZapflowError> {
    let mut query = Message::find()
        .filter(message::Column::BotId.eq(bot_id))
        .order_by(message::Column::CreatedAt, Order::Desc);

    if let Some(number) = user_number {
        query = query.filter(
            Condition::any()
                .add(message::Column::FromNumber.eq(number))
                .add(message::Column::ToNumber.eq(number)),
        );
    }

    let entries = query.limit(limit).offset(offset).all(db).await?;
    Ok(entries)
}

pub async fn delete_by_bot_id(bot_id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    Message::delete_many()
        .filter(message::Column::BotId.eq(bot_id))
        .exec(db)
        .await?;
    Ok(())
}
