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
use serde_json::json;
use tracing::{debug, info, warn};
use zapflow_common::event::EventKind;
use zapflow_common::flow::{ENTRY_NODE, FlowGraph, NodeKind};

use crate::db;
use crate::db::entities::{bot, message};
use crate::error::ZapflowError;
use crate::outbound;
use crate::settings::Settings;
use crate::whatsapp;

// Upper bound on nodes visited per inbound message; stops runaway walks over
// graphs with message cycles.
const MAX_STEPS: usize = 25;

/// Advance the caller's conversation through the bot's active flow.
///
/// The walk starts at the recorded current node (node "1" when no state
/// exists), emits message nodes as replies and follows their edges, and lets
/// at most one condition node consume the inbound text. A condition reached
/// after a reply was emitted rests until the next inbound message. A message
/// node with no outgoing edge completes the conversation: the state row is
/// deleted and the next message starts over.
///
/// Lookup failures (no active flow, node missing from the graph) leave the
/// conversation untouched and return no replies.
pub async fn advance(
    bot: &bot::Model,
    user_number: &str,
    text: &str,
    settings: &Settings,
    db: &DatabaseConnection,
) -> Result<Vec<message::Model>, ZapflowError> {
    let mut replies = vec![];

    let Some(flow) = db::flow::get_active_by_bot_id(&bot.id, db).await? else {
        warn!(
            bot_id = bot.id.to_string(),
            user_number = user_number.to_string(),
            "no active flow, message ignored"
        );
        return Ok(replies);
    };

    let graph: FlowGraph = serde_json::from_str(&flow.graph)?;

    let mut current = match db::flow_state::get(&bot.id, user_number, db).await? {
        Some(state) => state.current_node,
        None => ENTRY_NODE.to_owned(),
    };

    info!(
        bot_id = bot.id.to_string(),
        user_number = user_number.to_string(),
        flow = flow.id.to_string(),
        node = current.to_string(),
        "interpreter: start"
    );

    let mut text_consumed = false;
    let mut steps = 0;

    loop {
        steps += 1;
        if steps > MAX_STEPS {
            db::flow_log::create(&flow.id, &current, "error", "step limit reached", db).await?;
            warn!(
                flow = flow.id.to_string(),
                node = current.to_string(),
                "step limit reached, conversation parked"
            );
            break;
        }

        let Some(node) = graph.node(&current) else {
            db::flow_log::create(&flow.id, &current, "error", "node not found in graph", db)
                .await?;
            warn!(
                flow = flow.id.to_string(),
                node = current.to_string(),
                "current node missing from graph, conversation stuck"
            );
            break;
        };

        match node.kind {
            NodeKind::Condition => {
                // the inbound text drives at most one condition, and never
                // one reached after a reply was already emitted
                if text_consumed || !replies.is_empty() {
                    break;
                }
                text_consumed = true;

                match node.conditions.iter().find(|c| c.matches(text)) {
                    Some(matched) => {
                        debug!(
                            flow = flow.id.to_string(),
                            node = node.id.to_string(),
                            next = matched.next_node.to_string(),
                            "condition matched"
                        );
                        db::flow_log::create(
                            &flow.id,
                            &node.id,
                            "success",
                            &format!("condition matched, moving to node {}", matched.next_node),
                            db,
                        )
                        .await?;

                        current = matched.next_node.clone();
                        db::flow_state::set(&bot.id, user_number, &current, db).await?;
                    }
                    None => {
                        db::flow_log::create(&flow.id, &node.id, "success", "no condition matched", db)
                            .await?;
                        break;
                    }
                }
            }
            NodeKind::Message => {
                let content = node.content.as_deref().unwrap_or_default();
                let reply = whatsapp::send_text(bot, user_number, content, settings, db).await?;
                outbound::dispatch(
                    EventKind::ResponseSent,
                    json!({
                        "bot_id": bot.id,
                        "to": user_number,
                        "content": content,
                        "message_id": reply.id,
                    }),
                    db,
                )
                .await;
                replies.push(reply);

                db::flow_log::create(&flow.id, &node.id, "success", "message sent", db).await?;

                match graph.successor(&node.id) {
                    Some(next) => {
                        current = next.to_owned();
                        db::flow_state::set(&bot.id, user_number, &current, db).await?;
                    }
                    None => {
                        db::flow_state::delete(&bot.id, user_number, db).await?;
                        outbound::dispatch(
                            EventKind::FlowCompleted,
                            json!({
                                "bot_id": bot.id,
                                "user_number": user_number,
                                "flow_id": flow.id,
                            }),
                            db,
                        )
                        .await;
                        info!(
                            bot_id = bot.id.to_string(),
                            user_number = user_number.to_string(),
                            flow = flow.id.to_string(),
                            "flow completed"
                        );
                        break;
                    }
                }
            }
        }
    }

    Ok(replies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migration::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use serde_json::json;
    use zapflow_common::flow::FlowGraph;

    async fn get_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::refresh(&db).await.unwrap();
        db
    }

    async fn seed_bot_with_flow(
        db: &DatabaseConnection,
        graph: serde_json::Value,
    ) -> (bot::Model, String) {
        let bot = db::bot::create("user", "support bot", "15550000", db)
            .await
            .unwrap();
        let graph: FlowGraph = serde_json::from_value(graph).unwrap();
        let flow = db::flow::create(&bot.id, "main", &graph, db).await.unwrap();
        db::flow::activate(&flow.id, db).await.unwrap();
        (bot, flow.id)
    }

    fn menu_graph() -> serde_json::Value {
        json!({
            "nodes": [
                { "id": "1", "type": "message", "content": "Welcome!" },
                { "id": "2", "type": "message", "content": "Reply 1 for sales, 2 for support." },
                { "id": "3", "type": "condition", "conditions": [
                    { "op": "equals", "value": "1", "next_node": "4" },
                    { "op": "equals", "value": "2", "next_node": "5" }
                ]},
                { "id": "4", "type": "message", "content": "Sales here." },
                { "id": "5", "type": "message", "content": "Support here." }
            ],
            "edges": [
                { "id": "e1", "source": "1", "target": "2" },
                { "id": "e2", "source": "2", "target": "3" }
            ]
        })
    }

    #[tokio::test]
    async fn chains_messages_and_parks_on_the_condition() {
        let db = get_test_db().await;
        let (bot, _) = seed_bot_with_flow(&db, menu_graph()).await;

        let replies = advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();

        let contents: Vec<_> = replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["Welcome!", "Reply 1 for sales, 2 for support."]);

        let state = db::flow_state::get(&bot.id, "+15550001", &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.current_node, "3");
    }

    #[tokio::test]
    async fn condition_consumes_the_next_message_and_completes() {
        let db = get_test_db().await;
        let (bot, _) = seed_bot_with_flow(&db, menu_graph()).await;

        advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();
        let replies = advance(&bot, "+15550001", "1", &Settings::default(), &db)
            .await
            .unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "Sales here.");

        // terminal message node clears the state row
        assert!(
            db::flow_state::get(&bot.id, "+15550001", &db)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unmatched_condition_leaves_state_alone() {
        let db = get_test_db().await;
        let (bot, _) = seed_bot_with_flow(&db, menu_graph()).await;

        advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();
        let replies = advance(&bot, "+15550001", "potato", &Settings::default(), &db)
            .await
            .unwrap();

        assert!(replies.is_empty());
        let state = db::flow_state::get(&bot.id, "+15550001", &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.current_node, "3");
    }

    #[tokio::test]
    async fn starts_at_the_entry_condition() {
        let db = get_test_db().await;
        let (bot, _) = seed_bot_with_flow(
            &db,
            json!({
                "nodes": [
                    { "id": "1", "type": "condition", "conditions": [
                        { "op": "contains", "value": "price", "next_node": "2" }
                    ]},
                    { "id": "2", "type": "message", "content": "Plans start at $10." }
                ],
                "edges": []
            }),
        )
        .await;

        let replies = advance(&bot, "+15550001", "what is the PRICE?", &Settings::default(), &db)
            .await
            .unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "Plans start at $10.");
        assert_eq!(replies[0].direction, "SEND");
        assert_eq!(replies[0].status, "pending");
    }

    #[tokio::test]
    async fn no_active_flow_is_a_silent_noop() {
        let db = get_test_db().await;
        let bot = db::bot::create("user", "idle bot", "15550000", &db)
            .await
            .unwrap();

        let replies = advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();

        assert!(replies.is_empty());
        assert!(
            db::flow_state::get(&bot.id, "+15550001", &db)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn missing_entry_node_logs_an_error_row() {
        let db = get_test_db().await;
        let (bot, flow_id) = seed_bot_with_flow(
            &db,
            json!({
                "nodes": [{ "id": "9", "type": "message", "content": "unreachable" }],
                "edges": []
            }),
        )
        .await;

        let replies = advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();

        assert!(replies.is_empty());
        let logs = db::flow_log::get_by_flow_id(&flow_id, None, None, &db)
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, "error");
        assert_eq!(logs[0].node_id, "1");
    }

    #[tokio::test]
    async fn message_cycle_hits_the_step_limit() {
        let db = get_test_db().await;
        let (bot, flow_id) = seed_bot_with_flow(
            &db,
            json!({
                "nodes": [
                    { "id": "1", "type": "message", "content": "ping" },
                    { "id": "2", "type": "message", "content": "pong" }
                ],
                "edges": [
                    { "id": "e1", "source": "1", "target": "2" },
                    { "id": "e2", "source": "2", "target": "1" }
                ]
            }),
        )
        .await;

        let replies = advance(&bot, "+15550001", "hello", &Settings::default(), &db)
            .await
            .unwrap();

        assert_eq!(replies.len(), MAX_STEPS);
        let logs = db::flow_log::get_by_flow_id(&flow_id, None, None, &db)
            .await
            .unwrap();
        assert!(logs.iter().any(|l| l.detail == "step limit reached"));
    }
}
