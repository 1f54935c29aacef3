//! Client for the OpenClaw gateway's generic tool-invocation API.
//!
//! Every gateway operation is a `POST /tools/invoke` naming a tool. The reply
//! envelope nests the useful payload at varying depths; [`envelope`] is the one
//! place that flattens it. On top of that sit the session directory, the
//! cross-session log aggregator, the hash-gated config updater with the queue
//! settings built on it, cron pass-through calls and the health probe.

use std::sync::Arc;

use figgy_core::config::{DEFAULT_FAN_OUT, Settings};

pub mod config_cas;
pub mod cron;
pub mod envelope;
pub mod health;
pub mod logs;
pub mod mock;
pub mod queue;
pub mod sessions;
pub mod transport;

pub use config_cas::ConfigCas;
pub use cron::CronClient;
pub use health::HealthProbe;
pub use logs::LogAggregator;
pub use queue::QueueClient;
pub use sessions::SessionDirectory;
pub use transport::{GatewayTransport, HttpTransport, ToolInvocation};

/// Entry point bundling one transport with the services built on it.
///
/// Built once at startup and shared (it is cheap to clone).
#[derive(Clone)]
pub struct GatewayClient {
    transport: Arc<dyn GatewayTransport>,
    fan_out: usize,
}

impl GatewayClient {
    pub fn new(transport: Arc<dyn GatewayTransport>) -> Self {
        Self {
            transport,
            fan_out: DEFAULT_FAN_OUT,
        }
    }

    /// HTTP client configured from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let transport = HttpTransport::from_settings(settings);
        Self::new(Arc::new(transport)).with_fan_out(settings.logs.fan_out)
    }

    /// Number of session histories fetched concurrently by a log query.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn transport(&self) -> &dyn GatewayTransport {
        self.transport.as_ref()
    }

    pub fn sessions(&self) -> SessionDirectory<'_> {
        SessionDirectory::new(self.transport())
    }

    pub fn logs(&self) -> LogAggregator<'_> {
        LogAggregator::new(self.sessions(), self.fan_out)
    }

    pub fn config(&self) -> ConfigCas<'_> {
        ConfigCas::new(self.transport())
    }

    pub fn queue(&self) -> QueueClient<'_> {
        QueueClient::new(self.config(), self.sessions())
    }

    pub fn cron(&self) -> CronClient<'_> {
        CronClient::new(self.transport())
    }

    pub fn health(&self) -> HealthProbe<'_> {
        HealthProbe::new(self.transport())
    }
}
