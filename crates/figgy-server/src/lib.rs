//! Figgy HTTP API.
//!
//! A thin axum layer over [`figgy_gateway::GatewayClient`]: every handler
//! forwards to one gateway operation and maps [`figgy_core::error::FiggyError`]
//! onto an HTTP status.

pub mod config;
pub mod cron;
pub mod error;
pub mod extract;
pub mod logs;
pub mod queue;
pub mod server;
pub mod sessions;
pub mod state;
pub mod status;

pub use error::ApiError;
pub use server::{build_router, start_server};
pub use state::AppState;
