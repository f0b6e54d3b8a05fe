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

use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, info};
use zapflow_common::event::EventKind;

use crate::api::ApiState;
use crate::db::{self, entities::bot};
use crate::error::ZapflowError;
use crate::flow::interpret;
use crate::outbound;

#[derive(Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Shared tail of both ingress variants: persist the inbound message, fan out
/// `message_received`, then run the interpreter under the conversation lock.
/// Interpreter failures are logged and reported as an `error` event, never as
/// a failed request.
async fn process(
    state: &ApiState,
    bot: &bot::Model,
    from: &str,
    to: &str,
    content: &str,
    content_type: &str,
) -> Result<Response, ZapflowError> {
    let inbound = db::message::create(
        &bot.id,
        from,
        to,
        content,
        content_type,
        "RECEIVE",
        "received",
        &state.db,
    )
    .await?;

    outbound::dispatch(
        EventKind::MessageReceived,
        json!({
            "bot_id": bot.id,
            "from": from,
            "to": to,
            "content": content,
        }),
        &state.db,
    )
    .await;

    let _guard = state.locks.acquire(&bot.id, from).await;

    let replies = match interpret::advance(bot, from, content, &state.settings, &state.db).await {
        Ok(replies) => replies,
        Err(err) => {
            error!(
                bot_id = bot.id.to_string(),
                user_number = from.to_string(),
                "interpreter failed: {}",
                err
            );
            outbound::dispatch(
                EventKind::Error,
                json!({
                    "bot_id": bot.id,
                    "user_number": from,
                    "detail": err.to_string(),
                }),
                &state.db,
            )
            .await;
            vec![]
        }
    };

    info!(
        bot_id = bot.id.to_string(),
        message_id = inbound.id.to_string(),
        "processed inbound message, {} replies",
        replies.len()
    );

    Ok((
        StatusCode::OK,
        Json(json!({ "processed": true, "replies": replies.len() })),
    )
        .into_response())
}

/*
Token variant
*/

fn required_field<'a>(body: &'a Value, key: &str) -> Result<&'a str, ZapflowError> {
    body[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ZapflowError::BadRequest(format!("missing field `{}`", key)))
}

pub async fn receive(
    Query(params): Query<TokenQuery>,
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ZapflowError> {
    let token = params
        .token
        .ok_or_else(|| ZapflowError::Unauthorized("missing token".to_owned()))?;

    if db::webhook_config::get_by_token(&token, &state.db)
        .await?
        .is_none()
    {
        return Err(ZapflowError::Unauthorized("invalid token".to_owned()));
    }

    let from = required_field(&body, "from")?;
    let to = required_field(&body, "to")?;
    let content = required_field(&body, "content")?;
    let content_type = body["type"].as_str().unwrap_or("text");

    let Some(bot) = db::bot::get_active_by_phone_number(to, &state.db).await? else {
        return Err(ZapflowError::NotFound(format!("no bot for number {}", to)));
    };

    process(&state, &bot, from, to, content, content_type).await
}

/*
Cloud API variant
*/

fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), ZapflowError> {
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| ZapflowError::Unauthorized("malformed signature".to_owned()))?;
    let provided = hex::decode(hex_digest)
        .map_err(|_| ZapflowError::Unauthorized("malformed signature".to_owned()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| ZapflowError::Unauthorized("invalid signing key".to_owned()))?;
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    if bool::from(computed.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(ZapflowError::Unauthorized(
            "signature mismatch".to_owned(),
        ))
    }
}

pub async fn receive_cloud(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ZapflowError> {
    let secret = state
        .settings
        .app_secret
        .as_deref()
        .ok_or_else(|| ZapflowError::Unauthorized("app secret not configured".to_owned()))?;

    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ZapflowError::Unauthorized("missing signature".to_owned()))?;

    // the raw body is authenticated before anything is parsed out of it
    verify_signature(secret, signature, &body)?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| ZapflowError::BadRequest("invalid JSON payload".to_owned()))?;

    if payload["object"] != "whatsapp_business_account" {
        return Err(ZapflowError::BadRequest(
            "unexpected payload shape".to_owned(),
        ));
    }

    let value = &payload["entry"][0]["changes"][0]["value"];
    let message = &value["messages"][0];
    if !message.is_object() {
        // delivery/status notifications carry no message, acknowledge and move on
        return Ok((
            StatusCode::OK,
            Json(json!({ "processed": false })),
        )
            .into_response());
    }

    let from = message["from"]
        .as_str()
        .ok_or_else(|| ZapflowError::BadRequest("missing sender".to_owned()))?;
    let content = message["text"]["body"]
        .as_str()
        .or_else(|| message["image"]["caption"].as_str())
        .or_else(|| message["document"]["caption"].as_str())
        .unwrap_or("");

    let phone_number_id = value["metadata"]["phone_number_id"]
        .as_str()
        .ok_or_else(|| ZapflowError::BadRequest("missing phone_number_id".to_owned()))?;

    let Some(credentials) =
        db::whatsapp_token::get_by_phone_number_id(phone_number_id, &state.db).await?
    else {
        return Err(ZapflowError::NotFound(format!(
            "no bot for phone number id {}",
            phone_number_id
        )));
    };

    let bot = match db::bot::get_by_id(&credentials.bot_id, &state.db).await? {
        Some(bot) if bot.active => bot,
        _ => {
            return Err(ZapflowError::NotFound(format!(
                "bot {}",
                credentials.bot_id
            )));
        }
    };

    let to = bot.phone_number.clone();
    process(&state, &bot, from, &to, content, "text").await
}

/// Cloud API subscription handshake: echo the challenge back when the verify
/// token matches.
pub async fn verify_cloud(
    Query(params): Query<VerifyQuery>,
    State(state): State<ApiState>,
) -> Response {
    match (
        params.mode.as_deref(),
        params.verify_token,
        params.challenge,
        state.settings.verify_token,
    ) {
        (Some("subscribe"), Some(token), Some(challenge), Some(expected)) if token == expected => {
            (StatusCode::OK, challenge).into_response()
        }
        _ => (StatusCode::FORBIDDEN, ()).into_response(),
    }
}


#[cfg(test)]
mod test_receive_cloud {
    use crate::utils::get_test_state;
    use axum::http::{HeaderName, HeaderValue};
    use axum::{
        Router,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use serde_json::json;

    use super::*;

    const SECRET: &str = "cloud-secret";

    async fn seed_cloud(state: &ApiState) -> bot::Model {
        let bot = db::bot::create("user", "cloud bot", "15550000", &state.db)
            .await
            .unwrap();
        db::whatsapp_token::set(&bot.id, "token", "555012345", &state.db)
            .await
            .unwrap();
        let graph = serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "type": "condition", "conditions": [
                    { "op": "equals", "value": "never", "next_node": "2" }
                ]},
                { "id": "2", "type": "message", "content": "unreached" }
            ],
            "edges": []
        }))
        .unwrap();
        let flow = db::flow::create(&bot.id, "main", &graph, &state.db)
            .await
            .unwrap();
        db::flow::activate(&flow.id, &state.db).await.unwrap();
        bot
    }

    fn cloud_state(mut state: ApiState) -> ApiState {
        state.settings.app_secret = Some(SECRET.to_owned());
        state.settings.verify_token = Some("verify-me".to_owned());
        // keep outbound graph calls off the network
        state.settings.graph_api_base = "http://127.0.0.1:9/graph".to_owned();
        state
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn cloud_payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "555012345" },
                        "messages": [{
                            "from": "+15550001",
                            "text": { "body": "hello cloud" }
                        }]
                    }
                }]
            }]
        }))
        .unwrap()
    }

    fn app() -> Router<ApiState> {
        Router::new().route("/webhook/cloud", post(receive_cloud).get(verify_cloud))
    }

    #[tokio::test]
    async fn it_should_reject_a_missing_signature() {
        let state = cloud_state(get_test_state().await);
        seed_cloud(&state).await;
        let server = TestServer::new(app().with_state(state)).unwrap();

        server
            .post("/webhook/cloud")
            .bytes(cloud_payload().into())
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn it_should_reject_a_forged_signature() {
        let state = cloud_state(get_test_state().await);
        seed_cloud(&state).await;
        let server = TestServer::new(app().with_state(state)).unwrap();

        server
            .post("/webhook/cloud")
            .add_header(
                HeaderName::from_static("x-hub-signature-256"),
                HeaderValue::from_static("sha256=00ff00ff"),
            )
            .bytes(cloud_payload().into())
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn it_should_accept_a_signed_message() {
        let state = cloud_state(get_test_state().await);
        let bot = seed_cloud(&state).await;
        let server = TestServer::new(app().with_state(state.clone())).unwrap();

        let body = cloud_payload();
        let signature = sign(&body);

        let response = server
            .post("/webhook/cloud")
            .add_header(
                HeaderName::from_static("x-hub-signature-256"),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(body.into())
            .await;
        response.assert_status_ok();

        let messages = db::message::get_by_bot_id(&bot.id, None, None, None, &state.db)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hello cloud");
        assert_eq!(messages[0].direction, "RECEIVE");
    }

    #[tokio::test]
    async fn it_should_acknowledge_status_notifications() {
        let state = cloud_state(get_test_state().await);
        seed_cloud(&state).await;
        let server = TestServer::new(app().with_state(state)).unwrap();

        let body = serde_json::to_vec(&json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": { "phone_number_id": "555012345" },
                        "statuses": [{ "status": "delivered" }]
                    }
                }]
            }]
        }))
        .unwrap();
        let signature = sign(&body);

        let response = server
            .post("/webhook/cloud")
            .add_header(
                HeaderName::from_static("x-hub-signature-256"),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .bytes(body.into())
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["processed"], false);
    }

    #[tokio::test]
    async fn it_should_echo_the_handshake_challenge() {
        let state = cloud_state(get_test_state().await);
        let server = TestServer::new(app().with_state(state)).unwrap();

        let response = server
            .get("/webhook/cloud")
            .add_query_param("hub.mode", "subscribe")
            .add_query_param("hub.verify_token", "verify-me")
            .add_query_param("hub.challenge", "12345")
            .await;
        response.assert_status_ok();
        assert_eq!(response.text(), "12345");

        server
            .get("/webhook/cloud")
            .add_query_param("hub.mode", "subscribe")
            .add_query_param("hub.verify_token", "wrong")
            .add_query_param("hub.challenge", "12345")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
