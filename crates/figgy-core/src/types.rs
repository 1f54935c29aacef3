use std::str::FromStr;

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::FiggyError;

/// A flat JSON mapping: the effective payload of a gateway reply.
pub type Payload = serde_json::Map<String, Value>;

/// Raw reply of `POST /tools/invoke`.
///
/// `result` is kept untyped: depending on how many generic layers the gateway
/// wrapped around a tool's output it may be `{..}`, `{details: {..}}` or
/// `{details: {result: {..}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl GatewayEnvelope {
    /// Build an envelope from any JSON value. Non-objects become a failed envelope.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                ok: map.get("ok").and_then(Value::as_bool).unwrap_or(false),
                result: map.remove("result"),
                error: map.remove("error"),
            },
            other => Self {
                ok: false,
                result: None,
                error: Some(Value::String(format!("unexpected gateway reply: {other}"))),
            },
        }
    }
}

/// One gateway session as listed by `sessions_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Last activity, epoch milliseconds.
    #[serde(default, deserialize_with = "deserialize_epoch_ms")]
    pub updated_at: Option<i64>,
    /// Every other field the gateway reported (`sessionId`, token counts, ..).
    #[serde(flatten)]
    pub extra: Payload,
}

impl SessionSummary {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            channel: None,
            model: None,
            updated_at: None,
            extra: Payload::new(),
        }
    }

    /// Display name, or the first 40 characters of the key.
    pub fn name(&self) -> String {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.key.chars().take(40).collect(),
        }
    }
}

fn deserialize_epoch_ms<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(epoch_ms))
}

/// Interpret a JSON timestamp as epoch milliseconds.
///
/// Accepts integers, floats, numeric strings and RFC 3339 strings.
pub fn epoch_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.timestamp_millis())
        }),
        _ => None,
    }
}

/// Role reported for messages that carry none.
pub const MISSING_ROLE: &str = "unknown";

/// Message author role.
///
/// Serializes as the lowercase name; an unrecognized gateway role keeps the
/// string the gateway sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Unknown(String),
}

impl Role {
    /// Map a gateway role string; never fails.
    pub fn from_gateway(role: &str) -> Self {
        match role {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" | "toolResult" | "tool_result" => Self::Tool,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
            Self::Unknown(raw) => raw,
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FiggyError;

    /// Strict parse for caller-supplied filters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_gateway(s) {
            Self::Unknown(_) => Err(FiggyError::Validation(format!(
                "role must be one of user, assistant, system, tool (got '{s}')"
            ))),
            role => Ok(role),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in the aggregated log view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    pub session_key: String,
    pub session_name: Option<String>,
    pub channel: Option<String>,
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
    pub model: Option<String>,
    pub tool_name: Option<String>,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
}

/// One page of aggregated log messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogsPage {
    pub messages: Vec<LogMessage>,
    /// Matching messages across all scanned sessions, before pagination.
    pub total: usize,
    pub has_more: bool,
}

/// Filters of a log query. Everything unset matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilters {
    /// Substring of the session key.
    pub session_key: Option<String>,
    /// Exact channel name.
    pub channel: Option<String>,
    pub role: Option<Role>,
    /// Case-insensitive substring of the flattened content.
    pub search: Option<String>,
    pub include_tools: bool,
}

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// `limit` must lie in `[1, 500]`.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(FiggyError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT} (got {})",
                self.limit
            )));
        }
        Ok(())
    }

    /// Cut one page out of a fully materialized, ordered result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, usize, bool) {
        let total = items.len();
        let page = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        let has_more = self.offset.saturating_add(self.limit) < total;
        (page, total, has_more)
    }
}

/// Gateway configuration together with its CAS fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub config: Payload,
    /// Opaque server-issued fingerprint; pass it back to `config.patch`.
    pub hash: String,
}

/// Result of an accepted config patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatchOutcome {
    /// New fingerprint, when the gateway reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Normalized gateway payload.
    pub result: Payload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigSchema {
    pub schema: Payload,
    #[serde(rename = "uiHints")]
    pub ui_hints: Payload,
}

/// Effective `messages.queue` settings, with gateway defaults filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettings {
    pub mode: String,
    pub debounce_ms: u64,
    pub cap: u64,
    pub drop: String,
    pub by_channel: Payload,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            mode: "collect".into(),
            debounce_ms: 1000,
            cap: 20,
            drop: "summarize".into(),
            by_channel: Payload::new(),
        }
    }
}

impl QueueSettings {
    /// Read the `messages.queue` object; absent or mistyped fields keep
    /// their defaults.
    pub fn from_queue_config(queue: &Payload) -> Self {
        let defaults = Self::default();
        Self {
            mode: queue
                .get("mode")
                .and_then(Value::as_str)
                .map_or(defaults.mode, str::to_string),
            debounce_ms: queue
                .get("debounceMs")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.debounce_ms),
            cap: queue
                .get("cap")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.cap),
            drop: queue
                .get("drop")
                .and_then(Value::as_str)
                .map_or(defaults.drop, str::to_string),
            by_channel: queue
                .get("byChannel")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or(defaults.by_channel),
        }
    }
}

/// One session line of the queue view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSession {
    pub session_key: String,
    pub display_name: String,
    pub channel: Option<String>,
    pub updated_at: Option<i64>,
    pub model: Option<String>,
}

impl From<&SessionSummary> for QueueSession {
    fn from(s: &SessionSummary) -> Self {
        Self {
            session_key: s.key.clone(),
            display_name: s.name(),
            channel: s.channel.clone(),
            updated_at: s.updated_at,
            model: s.model.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStatus {
    pub config: QueueSettings,
    pub sessions: Vec<QueueSession>,
}

/// Queue fields to change; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<String>,
}

impl QueueUpdate {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.debounce_ms.is_none() && self.cap.is_none() && self.drop.is_none()
    }
}

/// Gateway health as seen through a `session_status` probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GatewayHealth {
    pub ok: bool,
    pub uptime_seconds: Option<f64>,
    /// Channel status map, or `{"error": ..}` when the probe failed.
    pub channels: Payload,
}

/// Busy/idle summary of the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStatus {
    pub busy: bool,
    pub current_session: Option<String>,
    pub current_session_name: Option<String>,
    pub current_session_channel: Option<String>,
    pub last_activity: Option<Value>,
    pub active_sessions: usize,
    pub model: Option<String>,
}
