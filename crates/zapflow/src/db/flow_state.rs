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

use super::entities::{prelude::*, *};
use crate::error::ZapflowError;

pub async fn get(
    bot_id: &str,
    user_number: &str,
    db: &DatabaseConnection,
) -> Result<Option<flow_state::Model>, ZapflowError> {
    let entry = FlowState::find()
        .filter(flow_state::Column::BotId.eq(bot_id))
        .filter(flow_state::Column::UserNumber.eq(user_number))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn set(
    bot_id: &str,
    user_number: &str,
    current_node: &str,
    db: &DatabaseConnection,
) -> Result<(), ZapflowError> {
    let Some(existing) = FlowState::find()
        .filter(flow_state::Column::BotId.eq(bot_id))
        .filter(flow_state::Column::UserNumber.eq(user_number))
        .one(db)
        .await?
    else {
        let entry = flow_state::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            bot_id: ActiveValue::Set(bot_id.to_owned()),
            user_number: ActiveValue::Set(user_number.to_owned()),
            current_node: ActiveValue::Set(current_node.to_owned()),
            ..Default::default()
        };
        entry.insert(db).await?;
        return Ok(());
    };

    let mut existing: flow_state::ActiveModel = existing.into();
    existing.current_node = ActiveValue::Set(current_node.to_owned());
    existing.update(db).await?;
    Ok(())
}

pub async fn delete(
    bot_id: &str,
    user_number: &str,
    db: &DatabaseConnection,
) -> Result<(), ZapflowError> {
    let entry = FlowState::find()
        .filter(flow_state::Column::BotId.eq(bot_id))
        .filter(flow_state::Column::UserNumber.eq(user_number))
        .one(db)
        .await?;

    if let Some(e) = entry {
        e.delete(db).await?;
    }

    Ok(())
}

pub async fn delete_by_bot_id(bot_id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    FlowState::delete_many()
        .filter(flow_state::Column::BotId.eq(bot_id))
        .exec(db)
        .await?;
    Ok(())
}
