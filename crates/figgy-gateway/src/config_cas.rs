//! Hash-gated gateway configuration updates.
//!
//! `get` returns the config with its fingerprint; `patch` submits a raw delta
//! together with the fingerprint the caller last saw. The gateway performs the
//! read-modify-write and rejects the delta when the fingerprint is stale.
//! Nothing is merged, cached or retried here.

use serde_json::Value;
use tracing::{debug, info, warn};

use figgy_core::error::{FiggyError, Result};
use figgy_core::types::{ConfigSchema, ConfigSnapshot, Payload, PatchOutcome};

use crate::envelope;
use crate::transport::{GatewayTransport, ToolInvocation};

const TOOL: &str = "gateway";

pub struct ConfigCas<'a> {
    transport: &'a dyn GatewayTransport,
}

impl<'a> ConfigCas<'a> {
    pub fn new(transport: &'a dyn GatewayTransport) -> Self {
        Self { transport }
    }

    /// Current config and its hash.
    pub async fn get(&self) -> Result<ConfigSnapshot> {
        let envelope = self
            .transport
            .invoke(&ToolInvocation::new(TOOL).action("config.get"))
            .await?;
        let payload = envelope::expect_ok(&envelope, TOOL)?;

        let snapshot = ConfigSnapshot {
            config: object_field(&payload, "config"),
            hash: string_field(&payload, "hash").unwrap_or_default(),
        };
        debug!(hash = %snapshot.hash, "Fetched gateway config");
        Ok(snapshot)
    }

    /// Submit `delta` against `base_hash`.
    ///
    /// A stale hash fails with [`FiggyError::StaleHash`]; the caller should
    /// `get` again, review, and decide whether to resubmit.
    pub async fn patch(&self, delta: &Payload, base_hash: &str) -> Result<PatchOutcome> {
        let raw = serde_json::to_string(delta)?;
        let invocation = ToolInvocation::new(TOOL)
            .action("config.patch")
            .arg("raw", raw)
            .arg("baseHash", base_hash);
        let envelope = self.transport.invoke(&invocation).await?;

        if !envelope::is_ok(&envelope) {
            let message = envelope::error_message(&envelope);
            if is_stale_hash_message(&message) {
                warn!(base_hash, %message, "Config patch rejected: stale hash");
                return Err(FiggyError::StaleHash { message });
            }
            warn!(base_hash, %message, "Config patch rejected");
            return Err(FiggyError::EnvelopeNotOk {
                tool: TOOL.into(),
                message,
            });
        }

        let result = envelope::unwrap_payload(&envelope);
        let hash = string_field(&result, "hash");
        info!(keys = delta.len(), new_hash = ?hash, "Config patch applied");
        Ok(PatchOutcome { hash, result })
    }

    /// JSON schema of the config plus UI hints; empty when unavailable.
    pub async fn schema(&self) -> Result<ConfigSchema> {
        let envelope = self
            .transport
            .invoke(&ToolInvocation::new(TOOL).action("config.schema"))
            .await?;
        let payload = envelope::payload_or(&envelope, Payload::new());
        Ok(ConfigSchema {
            schema: object_field(&payload, "schema"),
            ui_hints: object_field(&payload, "uiHints"),
        })
    }

    pub async fn restart(&self) -> Result<Payload> {
        let envelope = self
            .transport
            .invoke(&ToolInvocation::new(TOOL).action("restart"))
            .await?;
        let payload = envelope::expect_ok(&envelope, TOOL)?;
        info!("Gateway restart requested");
        Ok(payload)
    }
}

/// Phrases the gateway uses when the base hash is out of date. A bare "hash"
/// is not enough: validation errors can name hash-like config keys.
const STALE_HASH_MARKERS: &[&str] = &[
    "basehash",
    "base hash",
    "hash mismatch",
    "stale",
    "changed since",
    "re-run config.get",
];

/// Whether a rejection means "your base hash is out of date".
pub fn is_stale_hash_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    STALE_HASH_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

fn object_field(payload: &Payload, key: &str) -> Payload {
    payload
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn string_field(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}
