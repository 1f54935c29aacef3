//! `/api/sessions`: session listing, status and raw history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use figgy_core::error::FiggyError;
use figgy_core::types::{MAX_PAGE_LIMIT, Payload};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub active_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub include_tools: bool,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Value> {
    let sessions = state
        .gateway
        .sessions()
        .list_sessions(query.active_minutes)
        .await?;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Payload> {
    let status = state.gateway.sessions().session_status(Some(&key)).await?;
    Ok(Json(status))
}

pub async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Payload> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT} (got {limit})"
        )));
    }

    match state
        .gateway
        .sessions()
        .history_payload(&key, limit, query.include_tools)
        .await
    {
        Ok(payload) => Ok(Json(payload)),
        Err(FiggyError::EnvelopeNotOk { .. }) => Err(ApiError::not_found("Session not found")),
        Err(e) => Err(e.into()),
    }
}
