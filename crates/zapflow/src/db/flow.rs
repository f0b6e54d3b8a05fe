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

use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid;
use zapflow_common::flow::FlowGraph;

use super::entities::{prelude::*, *};
use crate::error::ZapflowError;

pub async fn create(
    bot_id: &str,
    name: &str,
    graph: &FlowGraph,
    db: &DatabaseConnection,
) -> Result<flow::Model, ZapflowError> {
    let model = flow::ActiveModel {
        id: ActiveValue::Set(uuid::Uuid::new_v4().to_string()),
        bot_id: ActiveValue::Set(bot_id.to_owned()),
        name: ActiveValue::Set(name.to_owned()),
        active: ActiveValue::Set(false),
        graph: ActiveValue::Set(serde_json::to_string(graph)?),
        ..Default::default()
    };

    let entry = model.insert(db).await?;
    Ok(entry)
}

pub async fn get_by_id(
    id: &str,
    db: &DatabaseConnection,
) -> Result<Option<flow::Model>, ZapflowError> {
    let entry = Flow::find_by_id(id).one(db).await?;
    Ok(entry)
}

pub async fn list_by_bot_id(
    bot_id: &str,
    limit: Option<u64>,
    offset: Option<u64>,
    db: &DatabaseConnection,
) -> Result<Vec<flow::Model>, ZapflowError> {
    let entries = Flow::find()
        .filter(flow::Column::BotId.eq(bot_id))
        .order_by(flow::Column::CreatedAt, Order::Desc)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;
    Ok(entries)
}

pub async fn get_active_by_bot_id(
    bot_id: &str,
    db: &DatabaseConnection,
) -> Result<Option<flow::Model>, ZapflowError> {
    let entry = Flow::find()
        .filter(flow::Column::BotId.eq(bot_id))
        .filter(flow::Column::Active.eq(true))
        .order_by(flow::Column::UpdatedAt, Order::Desc)
        .one(db)
        .await?;
    Ok(entry)
}

/// Activating a flow deactivates every other flow of the same bot in the
/// same transaction, so a bot never has two active flows.
pub async fn activate(
    id: &str,
    db: &DatabaseConnection,
) -> Result<Option<flow::Model>, ZapflowError> {
    let Some(entry) = Flow::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let txn = db.begin().await?;
    Flow::update_many()
        .col_expr(flow::Column::Active, Expr::value(false))
        .filter(flow::Column::BotId.eq(entry.bot_id.to_owned()))
        .exec(&txn)
        .await?;

    let mut entry: flow::ActiveModel = entry.into();
    entry.active = ActiveValue::Set(true);
    let updated = entry.update(&txn).await?;
    txn.commit().await?;

    Ok(Some(updated))
}

pub async fn delete_by_id(id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    super::flow_log::delete_by_flow_id(id, db).await?;
    Flow::delete_by_id(id).exec(db).await?;
    Ok(())
}

pub async fn delete_by_bot_id(bot_id: &str, db: &DatabaseConnection) -> Result<(), ZapflowError> {
    let flows = list_by_bot_id(bot_id, None, None, db).await?;
    for flow in flows {
        super::flow_log::delete_by_flow_id(&flow.id, db).await?;
    }

    Flow::delete_many()
        .filter(flow::Column::BotId.eq(bot_id))
        .exec(db)
        .await?;
    Ok(())
}
