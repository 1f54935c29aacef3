//! `/api/logs`: aggregated chat logs across sessions.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use figgy_core::types::{DEFAULT_PAGE_LIMIT, LogFilters, LogsPage, Pagination, Role};

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogsQuery {
    pub session_key: Option<String>,
    pub channel: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub include_tools: bool,
}

impl LogsQuery {
    fn filters(&self) -> figgy_core::error::Result<LogFilters> {
        let role = match self.role.as_deref().filter(|r| !r.is_empty()) {
            Some(r) => Some(r.parse::<Role>()?),
            None => None,
        };
        Ok(LogFilters {
            session_key: self.session_key.clone(),
            channel: self.channel.clone(),
            role,
            search: self.search.clone(),
            include_tools: self.include_tools,
        })
    }

    fn pagination(&self) -> Pagination {
        Pagination::new(
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LogsQuery>,
) -> ApiResult<LogsPage> {
    let filters = query.filters()?;
    let page = state
        .gateway
        .logs()
        .query(&filters, query.pagination())
        .await?;
    Ok(Json(page))
}

/// Sessions for the log filter dropdown, most recently updated first.
pub async fn get_log_sessions(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let sessions = state.gateway.sessions().recent_sessions().await?;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn get_log_channels(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let channels = state.gateway.sessions().channels().await?;
    Ok(Json(json!({ "channels": channels })))
}
