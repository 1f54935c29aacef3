//! `/api/queue`: message queue settings, and messages posted into sessions.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use figgy_core::types::{Payload, QueueStatus, QueueUpdate};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub async fn queue_status(State(state): State<Arc<AppState>>) -> ApiResult<QueueStatus> {
    Ok(Json(state.gateway.queue().status().await?))
}

/// 409 when another writer changed the config between read and patch.
pub async fn update_queue_config(
    State(state): State<Arc<AppState>>,
    ApiJson(update): ApiJson<QueueUpdate>,
) -> ApiResult<Value> {
    let body = match state.gateway.queue().update(&update).await? {
        Some(outcome) => json!({ "ok": true, "result": outcome.result }),
        None => json!({ "ok": true, "message": "No changes" }),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct SendQuery {
    pub message: String,
    pub session_key: Option<String>,
    pub label: Option<String>,
}

/// Fire-and-forget message into a session; the agent's reply is not awaited.
pub async fn send_to_session(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SendQuery>,
) -> ApiResult<Payload> {
    let result = state
        .gateway
        .sessions()
        .send(
            &query.message,
            query.session_key.as_deref(),
            query.label.as_deref(),
        )
        .await?;
    Ok(Json(result))
}
