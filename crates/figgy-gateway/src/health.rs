//! Gateway health probe and agent busy/idle status.

use serde_json::Value;
use tracing::debug;

use figgy_core::error::Result;
use figgy_core::types::{AgentStatus, GatewayHealth, Payload};

use crate::envelope;
use crate::sessions::SessionDirectory;
use crate::transport::{GatewayTransport, ToolInvocation};

/// Sessions active within this many minutes count towards `active_sessions`.
pub const ACTIVE_WINDOW_MINUTES: u32 = 5;

pub struct HealthProbe<'a> {
    transport: &'a dyn GatewayTransport,
}

impl<'a> HealthProbe<'a> {
    pub fn new(transport: &'a dyn GatewayTransport) -> Self {
        Self { transport }
    }

    /// Probe with a `session_status` call. Never fails: problems are
    /// reported inside the returned value.
    pub async fn health(&self) -> GatewayHealth {
        let reply = self
            .transport
            .invoke(&ToolInvocation::new("session_status"))
            .await;

        let error = match reply {
            Ok(env) if envelope::is_ok(&env) => {
                let data = envelope::unwrap_payload(&env);
                return GatewayHealth {
                    ok: true,
                    uptime_seconds: ["uptimeSeconds", "uptime_seconds"]
                        .iter()
                        .find_map(|k| data.get(*k).and_then(Value::as_f64)),
                    channels: data
                        .get("channels")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                };
            }
            Ok(_) => "Tool invoke failed".to_string(),
            Err(e) if e.is_connect() => "Cannot connect to gateway".to_string(),
            Err(e) if e.is_timeout() => "Gateway timeout".to_string(),
            Err(e) => e.to_string(),
        };

        debug!(%error, "Gateway health probe failed");
        let mut channels = Payload::new();
        channels.insert("error".into(), Value::String(error));
        GatewayHealth {
            ok: false,
            uptime_seconds: None,
            channels,
        }
    }

    /// Current session and busy flag, with the recently active session count.
    pub async fn agent_status(&self) -> Result<AgentStatus> {
        let directory = SessionDirectory::new(self.transport);
        let status = directory.session_status(None).await?;
        let active = directory
            .list_sessions(Some(ACTIVE_WINDOW_MINUTES))
            .await?;

        let current_session = status
            .get("sessionKey")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        let current = current_session
            .as_deref()
            .and_then(|key| active.iter().find(|s| s.key == key));

        Ok(AgentStatus {
            busy: status.get("busy").and_then(Value::as_bool).unwrap_or(false),
            current_session_name: current.map(|s| s.name()),
            current_session_channel: current.and_then(|s| s.channel.clone()),
            current_session,
            last_activity: status.get("lastActivity").cloned(),
            active_sessions: active.len(),
            model: status.get("model").and_then(Value::as_str).map(str::to_string),
        })
    }
}
