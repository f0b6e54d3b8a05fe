use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::{Rng, thread_rng};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use url::Url;
use zapflow_common::event::EventKind;
use zapflow_common::flow::FlowGraph;

use crate::db;
use crate::error::ZapflowError;
use crate::flow::ConversationLocks;
use crate::settings::Settings;

#[derive(Deserialize)]
pub struct QueryPagination {
    limit: Option<u64>,
    offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct QueryBots {
    user_id: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct QueryConversation {
    bot_id: String,
    user_number: String,
}

#[derive(Deserialize)]
pub struct QueryMessages {
    bot_id: String,
    user_number: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

#[derive(Deserialize)]
pub struct BotData {
    user_id: String,
    name: String,
    phone_number: String,
}

#[derive(Deserialize)]
pub struct FlowData {
    name: String,
    graph: FlowGraph,
}

#[derive(Deserialize)]
pub struct WebhookConfigData {
    user_id: String,
}

#[derive(Deserialize)]
pub struct WebhookData {
    user_id: String,
    url: Url,
    on_event: EventKind,
}

#[derive(Deserialize)]
pub struct WhatsappTokenData {
    access_token: String,
    phone_number_id: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub db: DatabaseConnection,
    pub auth: String,
    pub settings: Settings,
    pub locks: ConversationLocks,
}

/*
Bot
*/

pub async fn post_bot(
    State(state): State<ApiState>,
    Json(body): Json<BotData>,
) -> Result<impl IntoResponse, ZapflowError> {
    if body.name.is_empty() {
        return Err(ZapflowError::BadRequest("bot name is required".to_owned()));
    }
    if body.phone_number.is_empty() {
        return Err(ZapflowError::BadRequest(
            "bot phone_number is required".to_owned(),
        ));
    }

    let created = db::bot::create(&body.user_id, &body.name, &body.phone_number, &state.db).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_bots(
    Query(params): Query<QueryBots>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let bots = db::bot::list(
        params.user_id.as_deref(),
        params.limit,
        params.offset,
        &state.db,
    )
    .await?;
    Ok((StatusCode::OK, Json(bots)))
}

pub async fn get_bot(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    match db::bot::get_by_id(&id, &state.db).await? {
        Some(bot) => Ok((StatusCode::OK, Json(bot)).into_response()),
        None => Ok((StatusCode::NOT_FOUND, ()).into_response()),
    }
}

pub async fn delete_bot(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::bot::delete_by_id(&id, &state.db).await
}

#[cfg(test)]
mod test_bot {
    use crate::utils::get_test_server;
    use axum::{
        Router,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn it_should_create_a_bot() {
        let app = Router::new().route("/bots", post(post_bot));
        let server = get_test_server(app).await;

        server
            .post("/bots")
            .json(&json!({
                "user_id": "user",
                "name": "support bot",
                "phone_number": "15550000",
            }))
            .await
            .assert_status_success();
    }

    #[tokio::test]
    async fn it_should_reject_a_bot_without_a_number() {
        let app = Router::new().route("/bots", post(post_bot));
        let server = get_test_server(app).await;

        server
            .post("/bots")
            .json(&json!({
                "user_id": "user",
                "name": "support bot",
                "phone_number": "",
            }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn it_should_get_and_delete_a_bot() {
        let app = Router::new()
            .route("/bots", post(post_bot))
            .route("/bots/{id}", get(get_bot).delete(delete_bot));
        let server = get_test_server(app).await;

        let response: Value = server
            .post("/bots")
            .json(&json!({
                "user_id": "user",
                "name": "support bot",
                "phone_number": "15550000",
            }))
            .await
            .json();

        let bot_id = response["id"].as_str().unwrap().to_owned();
        let path = format!("/bots/{bot_id}");

        server.get(&path).await.assert_status_success();
        server.delete(&path).await.assert_status_success();
        server.get(&path).await.assert_status_not_found();
    }
}

/*
Flows
*/

pub async fn post_flow(
    Path(bot_id): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<FlowData>,
) -> Result<impl IntoResponse, ZapflowError> {
    if db::bot::get_by_id(&bot_id, &state.db).await?.is_none() {
        return Err(ZapflowError::NotFound(format!("bot {}", bot_id)));
    }

    body.graph.validate()?;

    let created = db::flow::create(&bot_id, &body.name, &body.graph, &state.db).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_flows(
    Path(bot_id): Path<String>,
    Query(params): Query<QueryPagination>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let flows = db::flow::list_by_bot_id(&bot_id, params.limit, params.offset, &state.db).await?;
    Ok((StatusCode::OK, Json(flows)))
}

pub async fn get_flow(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    match db::flow::get_by_id(&id, &state.db).await? {
        Some(flow) => Ok((StatusCode::OK, Json(flow)).into_response()),
        None => Ok((StatusCode::NOT_FOUND, ()).into_response()),
    }
}

pub async fn activate_flow(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    match db::flow::activate(&id, &state.db).await? {
        Some(flow) => Ok((StatusCode::OK, Json(flow)).into_response()),
        None => Ok((StatusCode::NOT_FOUND, ()).into_response()),
    }
}

pub async fn delete_flow(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::flow::delete_by_id(&id, &state.db).await
}

pub async fn get_flow_logs(
    Path(id): Path<String>,
    Query(params): Query<QueryPagination>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let logs = db::flow_log::get_by_flow_id(&id, params.limit, params.offset, &state.db).await?;
    Ok((StatusCode::OK, Json(logs)))
}

#[cfg(test)]
mod test_flow {
    use crate::utils::get_test_server;
    use axum::{
        Router,
        routing::{get, post},
    };
    use serde_json::{Value, json};

    use super::*;

    async fn create_bot(server: &axum_test::TestServer) -> String {
        let response: Value = server
            .post("/bots")
            .json(&json!({
                "user_id": "user",
                "name": "support bot",
                "phone_number": "15550000",
            }))
            .await
            .json();
        response["id"].as_str().unwrap().to_owned()
    }

    fn flow_body(name: &str) -> Value {
        json!({
            "name": name,
            "graph": {
                "nodes": [
                    { "id": "1", "type": "message", "content": "hello" }
                ],
                "edges": []
            }
        })
    }

    #[tokio::test]
    async fn it_should_create_a_flow() {
        let app = Router::new()
            .route("/bots", post(post_bot))
            .route("/bots/{id}/flows", post(post_flow));
        let server = get_test_server(app).await;

        let bot_id = create_bot(&server).await;
        server
            .post(&format!("/bots/{bot_id}/flows"))
            .json(&flow_body("main"))
            .await
            .assert_status_success();
    }

    #[tokio::test]
    async fn it_should_reject_a_broken_graph() {
        let app = Router::new()
            .route("/bots", post(post_bot))
            .route("/bots/{id}/flows", post(post_flow));
        let server = get_test_server(app).await;

        let bot_id = create_bot(&server).await;
        server
            .post(&format!("/bots/{bot_id}/flows"))
            .json(&json!({
                "name": "broken",
                "graph": {
                    "nodes": [
                        { "id": "1", "type": "condition", "conditions": [
                            { "op": "equals", "value": "hi", "next_node": "99" }
                        ]}
                    ],
                    "edges": []
                }
            }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn it_should_keep_a_single_active_flow() {
        let app = Router::new()
            .route("/bots", post(post_bot))
            .route("/bots/{id}/flows", post(post_flow).get(list_flows))
            .route("/flows/{id}/activate", post(activate_flow));
        let server = get_test_server(app).await;

        let bot_id = create_bot(&server).await;
        let first: Value = server
            .post(&format!("/bots/{bot_id}/flows"))
            .json(&flow_body("first"))
            .await
            .json();
        let second: Value = server
            .post(&format!("/bots/{bot_id}/flows"))
            .json(&flow_body("second"))
            .await
            .json();

        server
            .post(&format!("/flows/{}/activate", first["id"].as_str().unwrap()))
            .await
            .assert_status_success();
        server
            .post(&format!("/flows/{}/activate", second["id"].as_str().unwrap()))
            .await
            .assert_status_success();

        let flows: Value = server.get(&format!("/bots/{bot_id}/flows")).await.json();
        let active: Vec<_> = flows
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["active"].as_bool().unwrap())
            .collect();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["name"], "second");
    }

    #[tokio::test]
    async fn it_should_404_an_unknown_bot() {
        let app = Router::new().route("/bots/{id}/flows", post(post_flow));
        let server = get_test_server(app).await;

        server
            .post("/bots/nope/flows")
            .json(&flow_body("main"))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn it_should_list_flow_logs() {
        let app = Router::new()
            .route("/bots", post(post_bot))
            .route("/bots/{id}/flows", post(post_flow))
            .route("/flows/{id}/logs", get(get_flow_logs));
        let server = get_test_server(app).await;

        let bot_id = create_bot(&server).await;
        let flow: Value = server
            .post(&format!("/bots/{bot_id}/flows"))
            .json(&flow_body("main"))
            .await
            .json();

        let logs: Value = server
            .get(&format!("/flows/{}/logs", flow["id"].as_str().unwrap()))
            .await
            .json();
        assert_eq!(logs.as_array().unwrap().len(), 0);
    }
}

/*
Messages
*/

pub async fn get_messages(
    Query(params): Query<QueryMessages>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let messages = db::message::get_by_bot_id(
        &params.bot_id,
        params.user_number.as_deref(),
        params.limit,
        params.offset,
        &state.db,
    )
    .await?;
    Ok((StatusCode::OK, Json(messages)))
}

/*
States
*/

pub async fn get_state(
    Query(params): Query<QueryConversation>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    match db::flow_state::get(&params.bot_id, &params.user_number, &state.db).await? {
        Some(entry) => Ok((StatusCode::OK, Json(entry)).into_response()),
        None => Ok((StatusCode::NOT_FOUND, ()).into_response()),
    }
}

/// Resetting a conversation drops the pointer; the next message restarts the
/// flow from the entry node.
pub async fn delete_state(
    Query(params): Query<QueryConversation>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::flow_state::delete(&params.bot_id, &params.user_number, &state.db).await
}

/*
Webhook configs
*/

fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub async fn post_webhook_config(
    State(state): State<ApiState>,
    Json(body): Json<WebhookConfigData>,
) -> Result<impl IntoResponse, ZapflowError> {
    let created = db::webhook_config::create(&body.user_id, &generate_token(), &state.db).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_webhook_configs(
    Query(params): Query<QueryPagination>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let configs = db::webhook_config::list(params.limit, params.offset, &state.db).await?;
    Ok((StatusCode::OK, Json(configs)))
}

pub async fn delete_webhook_config(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::webhook_config::delete_by_id(&id, &state.db).await
}

#[cfg(test)]
mod test_webhook_config {
    use crate::utils::get_test_server;
    use axum::{Router, routing::post};
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn it_should_generate_a_token() {
        let app = Router::new()
            .route("/webhook-configs", post(post_webhook_config).get(list_webhook_configs));
        let server = get_test_server(app).await;

        let first: Value = server
            .post("/webhook-configs")
            .json(&json!({ "user_id": "user" }))
            .await
            .json();
        let second: Value = server
            .post("/webhook-configs")
            .json(&json!({ "user_id": "user" }))
            .await
            .json();

        let token = first["token"].as_str().unwrap();
        assert_eq!(token.len(), 48);
        assert_ne!(token, second["token"].as_str().unwrap());

        let configs: Value = server.get("/webhook-configs").await.json();
        assert_eq!(configs.as_array().unwrap().len(), 2);
    }
}

/*
Webhooks
*/

pub async fn post_webhook(
    State(state): State<ApiState>,
    Json(body): Json<WebhookData>,
) -> Result<impl IntoResponse, ZapflowError> {
    let created =
        db::webhook::create(&body.user_id, body.url.as_str(), body.on_event, &state.db).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_webhooks(
    Query(params): Query<QueryPagination>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    let hooks = db::webhook::list(params.limit, params.offset, &state.db).await?;
    Ok((StatusCode::OK, Json(hooks)))
}

pub async fn delete_webhook(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::webhook::delete_by_id(&id, &state.db).await
}


/*
WhatsApp credentials
*/

pub async fn put_whatsapp_token(
    Path(bot_id): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<WhatsappTokenData>,
) -> Result<impl IntoResponse, ZapflowError> {
    if db::bot::get_by_id(&bot_id, &state.db).await?.is_none() {
        return Err(ZapflowError::NotFound(format!("bot {}", bot_id)));
    }

    let entry = db::whatsapp_token::set(
        &bot_id,
        &body.access_token,
        &body.phone_number_id,
        &state.db,
    )
    .await?;
    Ok((StatusCode::OK, Json(entry)))
}

pub async fn delete_whatsapp_token(
    Path(bot_id): Path<String>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ZapflowError> {
    db::whatsapp_token::delete_by_bot_id(&bot_id, &state.db).await
}
