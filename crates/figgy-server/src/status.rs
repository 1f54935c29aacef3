//! `/api/status`: agent busy/idle and gateway health.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use figgy_core::types::{AgentStatus, GatewayHealth};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn agent_status(State(state): State<Arc<AppState>>) -> ApiResult<AgentStatus> {
    Ok(Json(state.gateway.health().agent_status().await?))
}

/// Always 200; an unreachable gateway is reported in the body.
pub async fn gateway_health(State(state): State<Arc<AppState>>) -> Json<GatewayHealth> {
    Json(state.gateway.health().health().await)
}
