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

pub async fn set(
    bot_id: &str,
    access_token: &str,
    phone_number_id: &str,
    db: &DatabaseConnection,
) -> Result<whatsapp_token::Model, ZapflowError> {
    let Some(existing) = WhatsappToken::find()
        .filter(whatsapp_token::Column::BotId.eq(bot_id))
        .one(db)
        .await?
    else {
        let entry = whatsapp_token::ActiveModel {
            id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
            bot_id: ActiveValue::Set(bot_id.to_owned()),
            access_token: ActiveValue::Set(access_token.to_owned()),
            phone_number_id: ActiveValue::Set(phone_number_id.to_owned()),
            ..Default::default()
        };
        let created = entry.insert(db).await?;
        return Ok(created);
    };

    let mut existing: whatsapp_token::ActiveModel = existing.into();
    existing.access_token = ActiveValue::Set(access_token.to_owned());
    existing.phone_number_id = ActiveValue::Set(phone_number_id.to_owned());
    let updated = existing.update(db).await?;
    Ok(updated)
}

pub async fn get_by_bot_id(
    bot_id: &str,
    db: &DatabaseConnection,
) -> Result<Option<whatsapp_token::Model>, ZapflowError> {
    let entry = WhatsappToken::find()
        .filter(whatsapp_token::Column::BotId.eq(bot_id))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn get_by_phone_number_id(
    phone_number_id: &str,
    db: &DatabaseConnection,
) -> Result<Option<whatsapp_token::Model>, ZapflowError> {
    let entry = WhatsappToken::find()
        .filter(whatsapp_token::Column::PhoneNumberId.eq(phone_number_id))
        .one(db)
        .await?;
    Ok(entry)
}

pub async fn delete_by_bot_id(bot_id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    WhatsappToken::delete_many()
        .filter(whatsapp_token::Column::BotId.eq(bot_id))
        .exec(db)
        .await?;
    Ok(())
}
