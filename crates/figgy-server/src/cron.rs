//! `/api/cron`: pass-through to the gateway's cron scheduler.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use figgy_core::types::Payload;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub include_disabled: bool,
}

/// Fields of a job that may be changed; unset fields are left alone.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl JobPatch {
    fn into_payload(self) -> figgy_core::error::Result<Payload> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Payload::new()),
        }
    }
}

pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().status().await?))
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().list(query.include_disabled).await?))
}

pub async fn create_job(
    State(state): State<Arc<AppState>>,
    ApiJson(job): ApiJson<Payload>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().add(job).await?))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().find_job(&id).await?))
}

pub async fn update_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<JobPatch>,
) -> ApiResult<Payload> {
    let patch = patch.into_payload()?;
    Ok(Json(state.gateway.cron().update(&id, patch).await?))
}

pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().remove(&id).await?))
}

pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().run(&id).await?))
}

pub async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().pause(&id).await?))
}

pub async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().resume(&id).await?))
}

pub async fn job_runs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Payload> {
    Ok(Json(state.gateway.cron().runs(&id).await?))
}
