//! `/api/config`: hash-gated gateway configuration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use figgy_core::types::{ConfigSchema, ConfigSnapshot, Payload};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PatchRequest {
    pub patch: Payload,
    pub base_hash: String,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> ApiResult<ConfigSnapshot> {
    Ok(Json(state.gateway.config().get().await?))
}

/// 409 when `base_hash` no longer matches; the client must reload first.
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<PatchRequest>,
) -> ApiResult<Payload> {
    let outcome = state
        .gateway
        .config()
        .patch(&request.patch, &request.base_hash)
        .await?;
    Ok(Json(outcome.result))
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> ApiResult<ConfigSchema> {
    Ok(Json(state.gateway.config().schema().await?))
}

pub async fn restart(State(state): State<Arc<AppState>>) -> ApiResult<Payload> {
    Ok(Json(state.gateway.config().restart().await?))
}
