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
    flow_id: &str,
    node_id: &str,
    status: &str,
    detail: &str,
    db: &DatabaseConnection,
) -> Result<(), ZapflowError> {
    let model = flow_log::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        flow_id: ActiveValue::Set(flow_id.to_owned()),
        node_id: ActiveValue::Set(node_id.to_owned()),
        status: ActiveValue::Set(status.to_owned()),
        detail: ActiveValue::Set(detail.to_owned()),
        ..Default::default()
    };

    model.insert(db).await?;
    Ok(())
}

pub async fn get_by_flow_id(
    flow_id: &str,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<flow_log::Model>, ZapflowError> {
    let entries = FlowLog::find()
        .filter(flow_log::Column::FlowId.eq(flow_id))
        .order_by(flow_log::Column::CreatedAt, Order::Desc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn delete_by_flow_id(flow_id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    FlowLog::delete_many()
        .filter(flow_log::Column::FlowId.eq(flow_id))
        .exec(db)
        .await?;
    Ok(())
}
