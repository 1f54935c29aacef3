//! HTTP plumbing for `POST /tools/invoke`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use figgy_core::config::Settings;
use figgy_core::error::{FiggyError, Result};
use figgy_core::types::{GatewayEnvelope, Payload};

/// Path of the gateway's generic tool-invocation endpoint.
pub const TOOLS_INVOKE_PATH: &str = "/tools/invoke";

/// Session a tool runs under unless the caller names another.
pub const DEFAULT_SESSION_KEY: &str = "main";

/// One tool call, serialized verbatim as the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool: String,
    pub args: Payload,
    pub session_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: Payload::new(),
            session_key: DEFAULT_SESSION_KEY.into(),
            action: None,
        }
    }

    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    pub fn args(mut self, args: Payload) -> Self {
        self.args = args;
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn session_key(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = session_key.into();
        self
    }
}

/// Something that can deliver a [`ToolInvocation`] to the gateway.
///
/// Implementations must not retry; the caller decides what a failure means.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<GatewayEnvelope>;
}

/// reqwest-backed transport with bearer auth and a per-call timeout.
pub struct HttpTransport {
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}{TOOLS_INVOKE_PATH}", base_url.trim_end_matches('/')),
            token: token.filter(|t| !t.is_empty()),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.gateway_url(),
            settings.gateway.resolve_token(),
            settings.gateway.tool_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<GatewayEnvelope> {
        debug!(
            tool = %invocation.tool,
            action = ?invocation.action,
            session = %invocation.session_key,
            "Invoking gateway tool"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(invocation);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(tool = %invocation.tool, %status, "Gateway returned an error status");
            return Err(FiggyError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        Ok(GatewayEnvelope::from_value(value))
    }
}
