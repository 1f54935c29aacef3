//! Message queue settings (`messages.queue`) and the sessions they apply to.
//!
//! Reads go through `config.get`; writes are a `messages.queue` delta sent
//! through [`ConfigCas::patch`] against the hash of a fresh `config.get`.

use serde_json::Value;
use tracing::{debug, info};

use figgy_core::error::Result;
use figgy_core::types::{
    PatchOutcome, Payload, QueueSession, QueueSettings, QueueStatus, QueueUpdate,
};

use crate::config_cas::ConfigCas;
use crate::sessions::SessionDirectory;

/// Sessions listed alongside the queue settings.
pub const MAX_QUEUE_SESSIONS: usize = 20;

pub struct QueueClient<'a> {
    config: ConfigCas<'a>,
    sessions: SessionDirectory<'a>,
}

impl<'a> QueueClient<'a> {
    pub fn new(config: ConfigCas<'a>, sessions: SessionDirectory<'a>) -> Self {
        Self { config, sessions }
    }

    pub async fn status(&self) -> Result<QueueStatus> {
        let snapshot = self.config.get().await?;
        let queue = queue_section(&snapshot.config);
        let sessions = self.sessions.list_sessions(None).await?;
        debug!(sessions = sessions.len(), "Read queue status");
        Ok(QueueStatus {
            config: QueueSettings::from_queue_config(&queue),
            sessions: sessions
                .iter()
                .take(MAX_QUEUE_SESSIONS)
                .map(QueueSession::from)
                .collect(),
        })
    }

    /// Apply `update`; `Ok(None)` when it changes nothing and no call is made.
    ///
    /// The base hash is read right before patching, so this only fails as
    /// stale when another writer lands in between.
    pub async fn update(&self, update: &QueueUpdate) -> Result<Option<PatchOutcome>> {
        if update.is_empty() {
            return Ok(None);
        }
        let snapshot = self.config.get().await?;
        let delta = queue_delta(update)?;
        let outcome = self.config.patch(&delta, &snapshot.hash).await?;
        info!(?update, "Queue settings updated");
        Ok(Some(outcome))
    }
}

fn queue_section(config: &Payload) -> Payload {
    config
        .get("messages")
        .and_then(|m| m.get("queue"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// `{"messages": {"queue": {..set fields..}}}`
fn queue_delta(update: &QueueUpdate) -> Result<Payload> {
    let mut messages = Payload::new();
    messages.insert("queue".into(), serde_json::to_value(update)?);
    let mut delta = Payload::new();
    delta.insert("messages".into(), Value::Object(messages));
    Ok(delta)
}
