//! Session directory, always fetched fresh from the gateway.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use figgy_core::error::{FiggyError, Result};
use figgy_core::types::{GatewayEnvelope, Payload, SessionSummary};

use crate::envelope;
use crate::transport::{GatewayTransport, ToolInvocation};

/// Lists sessions and reads per-session data through the gateway.
pub struct SessionDirectory<'a> {
    transport: &'a dyn GatewayTransport,
}

impl<'a> SessionDirectory<'a> {
    pub fn new(transport: &'a dyn GatewayTransport) -> Self {
        Self { transport }
    }

    /// All sessions, optionally only those active in the last `active_minutes`.
    ///
    /// A not-ok envelope yields an empty list; transport failures propagate.
    pub async fn list_sessions(&self, active_minutes: Option<u32>) -> Result<Vec<SessionSummary>> {
        let mut invocation = ToolInvocation::new("sessions_list");
        if let Some(minutes) = active_minutes.filter(|m| *m > 0) {
            invocation = invocation.arg("activeMinutes", minutes);
        }

        let envelope = self.transport.invoke(&invocation).await?;
        if !envelope::is_ok(&envelope) {
            debug!(error = %envelope::error_message(&envelope), "sessions_list not ok");
            return Ok(Vec::new());
        }

        let sessions = parse_sessions(session_entries(&envelope));
        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions)
    }

    /// Raw `sessions_history` payload; `EnvelopeNotOk` when the gateway refuses.
    pub async fn history_payload(
        &self,
        session_key: &str,
        limit: usize,
        include_tools: bool,
    ) -> Result<Payload> {
        let invocation = ToolInvocation::new("sessions_history")
            .arg("sessionKey", session_key)
            .arg("limit", limit)
            .arg("includeTools", include_tools);
        let envelope = self.transport.invoke(&invocation).await?;
        envelope::expect_ok(&envelope, "sessions_history")
    }

    /// Messages of one session, read from `messages` or, failing that, `history`.
    pub async fn history(
        &self,
        session_key: &str,
        limit: usize,
        include_tools: bool,
    ) -> Result<Vec<Value>> {
        let payload = self.history_payload(session_key, limit, include_tools).await?;
        Ok(history_messages(&payload))
    }

    /// `session_status` payload, empty when the gateway refuses.
    pub async fn session_status(&self, session_key: Option<&str>) -> Result<Payload> {
        let mut invocation = ToolInvocation::new("session_status");
        if let Some(key) = session_key {
            invocation = invocation.arg("sessionKey", key);
        }
        let envelope = self.transport.invoke(&invocation).await?;
        Ok(envelope::payload_or(&envelope, Payload::new()))
    }

    /// Post `message` into a session without waiting for the agent's reply.
    ///
    /// With neither `session_key` nor `label` the gateway picks its main
    /// session.
    pub async fn send(
        &self,
        message: &str,
        session_key: Option<&str>,
        label: Option<&str>,
    ) -> Result<Payload> {
        if message.trim().is_empty() {
            return Err(FiggyError::Validation("message must not be empty".into()));
        }
        let mut invocation = ToolInvocation::new("sessions_send").arg("message", message);
        if let Some(key) = session_key.filter(|k| !k.is_empty()) {
            invocation = invocation.arg("sessionKey", key);
        }
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            invocation = invocation.arg("label", label);
        }
        let envelope = self.transport.invoke(&invocation).await?;
        let payload = envelope::expect_ok(&envelope, "sessions_send")?;
        debug!(session = ?session_key, ?label, "Message sent to session");
        Ok(payload)
    }

    /// Sessions for the log filter UI, most recently updated first.
    pub async fn recent_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions = self.list_sessions(None).await?;
        for s in &mut sessions {
            s.display_name = Some(s.name());
        }
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at.unwrap_or(0)));
        Ok(sessions)
    }

    /// Distinct non-empty channel names, sorted.
    pub async fn channels(&self) -> Result<Vec<String>> {
        let sessions = self.list_sessions(None).await?;
        let channels: BTreeSet<String> = sessions
            .into_iter()
            .filter_map(|s| s.channel)
            .filter(|c| !c.is_empty())
            .collect();
        Ok(channels.into_iter().collect())
    }
}

/// The `sessions` array: normalized payload first, then `result.sessions`.
fn session_entries(envelope: &GatewayEnvelope) -> Vec<Value> {
    let payload = envelope::unwrap_payload(envelope);
    if let Some(Value::Array(items)) = payload.get("sessions") {
        return items.clone();
    }
    envelope
        .result
        .as_ref()
        .and_then(|r| r.get("sessions"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Entries that are not objects with a string `key` are dropped.
fn parse_sessions(entries: Vec<Value>) -> Vec<SessionSummary> {
    entries
        .iter()
        .filter_map(|entry| match SessionSummary::deserialize(entry) {
            Ok(s) => Some(s),
            Err(e) => {
                debug!(%e, "Skipping malformed session entry");
                None
            }
        })
        .collect()
}

fn history_messages(payload: &Payload) -> Vec<Value> {
    ["messages", "history"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}
