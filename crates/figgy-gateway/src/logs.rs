//! Cross-session log aggregation.
//!
//! A query lists sessions, fetches a bounded slice of each session's history,
//! flattens and filters every message, then sorts and paginates the merged
//! set. A session whose history cannot be fetched is skipped; only a failure
//! of the initial session listing fails the query.

use std::cmp::Reverse;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use figgy_core::content::{flatten_content, truncate_chars};
use figgy_core::error::Result;
use figgy_core::types::{
    LogFilters, LogMessage, LogsPage, MISSING_ROLE, Pagination, Role, SessionSummary, epoch_ms,
};

use crate::sessions::SessionDirectory;

/// At most this many sessions are scanned per query, in directory order.
pub const MAX_SCANNED_SESSIONS: usize = 50;

/// History messages requested per scanned session.
pub const HISTORY_LIMIT_PER_SESSION: usize = 50;

/// Flattened content is cut to this many code points.
pub const MAX_CONTENT_CHARS: usize = 2000;

pub struct LogAggregator<'a> {
    sessions: SessionDirectory<'a>,
    fan_out: usize,
}

impl<'a> LogAggregator<'a> {
    /// `fan_out` bounds concurrent history fetches; 1 fetches serially.
    pub fn new(sessions: SessionDirectory<'a>, fan_out: usize) -> Self {
        Self {
            sessions,
            fan_out: fan_out.max(1),
        }
    }

    pub async fn query(&self, filters: &LogFilters, pagination: Pagination) -> Result<LogsPage> {
        pagination.validate()?;

        let sessions = self.sessions.list_sessions(None).await?;
        let scanned: Vec<&SessionSummary> = sessions
            .iter()
            .take(MAX_SCANNED_SESSIONS)
            .filter(|s| matches_session(s, filters))
            .collect();
        debug!(
            listed = sessions.len(),
            scanned = scanned.len(),
            fan_out = self.fan_out,
            "Aggregating session logs"
        );

        // Build the futures before streaming them so the query future stays
        // `Send`. `buffered` yields in input order, so the merge does not
        // depend on which fetch finishes first.
        let fetches: Vec<_> = scanned
            .into_iter()
            .map(|session| self.collect_session(session, filters))
            .collect();
        let batches: Vec<Vec<LogMessage>> = stream::iter(fetches)
            .buffered(self.fan_out)
            .collect()
            .await;

        let mut messages: Vec<LogMessage> = batches.into_iter().flatten().collect();
        sort_newest_first(&mut messages);

        let (messages, total, has_more) = pagination.paginate(messages);
        Ok(LogsPage {
            messages,
            total,
            has_more,
        })
    }

    async fn collect_session(
        &self,
        session: &SessionSummary,
        filters: &LogFilters,
    ) -> Vec<LogMessage> {
        let history = self
            .sessions
            .history(&session.key, HISTORY_LIMIT_PER_SESSION, filters.include_tools)
            .await;
        match history {
            Ok(raw) => raw
                .iter()
                .filter_map(|m| to_log_message(session, m, filters))
                .collect(),
            Err(e) => {
                warn!(session = %session.key, error = %e, "Skipping session: history unavailable");
                Vec::new()
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Session-level pre-filter, applied before any history is fetched.
pub fn matches_session(session: &SessionSummary, filters: &LogFilters) -> bool {
    if let Some(needle) = non_empty(&filters.session_key) {
        if !session.key.contains(needle) {
            return false;
        }
    }
    if let Some(channel) = non_empty(&filters.channel) {
        if session.channel.as_deref() != Some(channel) {
            return false;
        }
    }
    true
}

/// Turn one raw history message into a log entry, or `None` when it is blank
/// or filtered out. Search runs on the full content, before truncation.
pub fn to_log_message(
    session: &SessionSummary,
    raw: &Value,
    filters: &LogFilters,
) -> Option<LogMessage> {
    let flat = flatten_content(raw.get("content"));
    if flat.is_blank() {
        return None;
    }

    let role = Role::from_gateway(
        raw.get("role")
            .and_then(Value::as_str)
            .unwrap_or(MISSING_ROLE),
    );
    if let Some(wanted) = &filters.role {
        if &role != wanted {
            return None;
        }
    }

    if let Some(needle) = non_empty(&filters.search) {
        if !flat.text.to_lowercase().contains(&needle.to_lowercase()) {
            return None;
        }
    }

    let usage = raw.get("usage");
    let model = raw
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| session.model.clone());

    Some(LogMessage {
        session_key: session.key.clone(),
        session_name: Some(session.name()),
        channel: session.channel.clone(),
        role,
        content: truncate_chars(&flat.text, MAX_CONTENT_CHARS),
        timestamp: raw.get("timestamp").and_then(epoch_ms),
        model,
        tool_name: flat.tool_name,
        tokens_in: usage.and_then(|u| u.get("input")).and_then(Value::as_u64),
        tokens_out: usage.and_then(|u| u.get("output")).and_then(Value::as_u64),
    })
}

/// Newest first; a missing timestamp sorts as 0. Stable, so equal
/// timestamps keep session-then-history order.
pub fn sort_newest_first(messages: &mut [LogMessage]) {
    messages.sort_by_key(|m| Reverse(m.timestamp.unwrap_or(0)));
}
