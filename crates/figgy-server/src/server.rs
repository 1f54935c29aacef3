//! Router assembly and the listening loop.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;
use crate::{config, cron, logs, queue, sessions, status};

/// Full API router with CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/logs", get(logs::get_logs))
        .route("/api/logs/sessions", get(logs::get_log_sessions))
        .route("/api/logs/channels", get(logs::get_log_channels))
        .route("/api/sessions", get(sessions::list_sessions))
        .route("/api/sessions/{key}/status", get(sessions::session_status))
        .route("/api/sessions/{key}/history", get(sessions::session_history))
        .route(
            "/api/config",
            get(config::get_config).patch(config::patch_config),
        )
        .route("/api/config/schema", get(config::get_schema))
        .route("/api/config/restart", post(config::restart))
        .route("/api/queue/status", get(queue::queue_status))
        .route("/api/queue/config", patch(queue::update_queue_config))
        .route("/api/command/send", post(queue::send_to_session))
        .route("/api/status", get(status::agent_status))
        .route("/api/status/health", get(status::gateway_health))
        .route("/api/cron/status", get(cron::status))
        .route("/api/cron/jobs", get(cron::list_jobs).post(cron::create_job))
        .route(
            "/api/cron/jobs/{id}",
            get(cron::get_job)
                .patch(cron::update_job)
                .delete(cron::delete_job),
        )
        .route("/api/cron/jobs/{id}/run", post(cron::run_job))
        .route("/api/cron/jobs/{id}/pause", post(cron::pause_job))
        .route("/api/cron/jobs/{id}/resume", post(cron::resume_job))
        .route("/api/cron/jobs/{id}/runs", get(cron::job_runs))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Start the API server and serve until Ctrl+C.
pub async fn start_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let server = &state.settings.server;
    let addr = format!("{}:{}", server.bind, server.port);
    let gateway_url = state.settings.gateway_url().to_string();

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, gateway = %gateway_url, "Figgy API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Figgy API stopped");
    Ok(())
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "name": "Figgy API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
