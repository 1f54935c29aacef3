//! Mapping of [`FiggyError`] onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use figgy_core::error::FiggyError;

/// An error response rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }
}

impl From<FiggyError> for ApiError {
    fn from(err: FiggyError) -> Self {
        match &err {
            FiggyError::Transport { .. } | FiggyError::Http(_) | FiggyError::EnvelopeNotOk { .. } => {
                warn!(error = %err, "Gateway call failed");
                Self::new(StatusCode::BAD_GATEWAY, format!("Gateway error: {err}"))
            }
            FiggyError::StaleHash { message } => Self::new(StatusCode::CONFLICT, message.clone()),
            FiggyError::Validation(message) => Self::bad_request(message.clone()),
            FiggyError::NotFound(_) => Self::not_found(err.to_string()),
            FiggyError::Config(_) | FiggyError::Io(_) | FiggyError::Json(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
