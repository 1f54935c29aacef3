//! Shared application state.

use figgy_core::config::Settings;
use figgy_gateway::GatewayClient;

/// Built once at startup and shared by every handler through `Arc<AppState>`.
pub struct AppState {
    pub gateway: GatewayClient,
    pub settings: Settings,
}

impl AppState {
    pub fn new(gateway: GatewayClient, settings: Settings) -> Self {
        Self { gateway, settings }
    }

    /// State talking to the gateway over HTTP as configured.
    pub fn from_settings(settings: Settings) -> Self {
        let gateway = GatewayClient::from_settings(&settings);
        Self::new(gateway, settings)
    }
}
