//! Envelope normalization.
//!
//! The gateway wraps each tool's output in as many generic layers as the
//! upstream dispatch added, so the same logical payload can arrive as
//! `result`, `result.details` or `result.details.result`. Everything above
//! this module works on the flat payload returned by [`unwrap_payload`].

use serde_json::Value;

use figgy_core::error::{FiggyError, Result};
use figgy_core::types::{GatewayEnvelope, Payload};

/// Effective payload: `result.details.result`, else `result.details`, else
/// `result`, else an empty mapping. Non-object candidates count as absent.
///
/// Never fails.
pub fn unwrap_payload(envelope: &GatewayEnvelope) -> Payload {
    let Some(Value::Object(result)) = envelope.result.as_ref() else {
        return Payload::new();
    };
    match result.get("details") {
        Some(Value::Object(details)) => match details.get("result") {
            Some(Value::Object(inner)) => inner.clone(),
            _ => details.clone(),
        },
        _ => result.clone(),
    }
}

pub fn is_ok(envelope: &GatewayEnvelope) -> bool {
    envelope.ok
}

/// Best-effort failure text of a not-ok envelope.
pub fn error_message(envelope: &GatewayEnvelope) -> String {
    envelope
        .error
        .as_ref()
        .and_then(describe_error)
        .or_else(|| {
            unwrap_payload(envelope)
                .get("error")
                .and_then(describe_error)
        })
        .unwrap_or_else(|| "Tool invoke failed".to_string())
}

fn describe_error(error: &Value) -> Option<String> {
    match error {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => ["message", "error", "code"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// The payload of an ok envelope, or `EnvelopeNotOk` naming the tool.
pub fn expect_ok(envelope: &GatewayEnvelope, tool: &str) -> Result<Payload> {
    if is_ok(envelope) {
        Ok(unwrap_payload(envelope))
    } else {
        Err(FiggyError::EnvelopeNotOk {
            tool: tool.to_string(),
            message: error_message(envelope),
        })
    }
}

/// The payload of an ok envelope, or `fallback` when the gateway said no.
pub fn payload_or(envelope: &GatewayEnvelope, fallback: Payload) -> Payload {
    if is_ok(envelope) {
        unwrap_payload(envelope)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(value: Value) -> GatewayEnvelope {
        GatewayEnvelope::from_value(value)
    }

    #[test]
    fn test_unwrap_flat_result() {
        let e = env(json!({"ok": true, "result": {"sessions": [1]}}));
        assert_eq!(Value::Object(unwrap_payload(&e)), json!({"sessions": [1]}));
    }

    #[test]
    fn test_unwrap_details() {
        let e = env(json!({"ok": true, "result": {"content": [], "details": {"jobs": []}}}));
        assert_eq!(Value::Object(unwrap_payload(&e)), json!({"jobs": []}));
    }

    #[test]
    fn test_unwrap_details_result() {
        let e = env(json!({
            "ok": true,
            "result": {"details": {"ok": true, "result": {"config": {"a": 1}, "hash": "h1"}}}
        }));
        assert_eq!(
            Value::Object(unwrap_payload(&e)),
            json!({"config": {"a": 1}, "hash": "h1"})
        );
    }

    #[test]
    fn test_unwrap_malformed_is_empty() {
        for value in [
            json!({"ok": true}),
            json!({"ok": true, "result": null}),
            json!({"ok": true, "result": "text"}),
            json!({"ok": true, "result": [1, 2, 3]}),
            json!("garbage"),
        ] {
            assert!(unwrap_payload(&env(value)).is_empty());
        }
    }

    #[test]
    fn test_non_object_levels_are_skipped() {
        let e = env(json!({"ok": true, "result": {"details": "str", "x": 1}}));
        assert_eq!(Value::Object(unwrap_payload(&e)), json!({"details": "str", "x": 1}));

        let e = env(json!({"ok": true, "result": {"details": {"result": 5, "y": 2}}}));
        assert_eq!(Value::Object(unwrap_payload(&e)), json!({"result": 5, "y": 2}));
    }

    #[test]
    fn test_error_message_sources() {
        let e = env(json!({"ok": false, "error": "boom"}));
        assert_eq!(error_message(&e), "boom");

        let e = env(json!({"ok": false, "error": {"type": "x", "message": "bad hash"}}));
        assert_eq!(error_message(&e), "bad hash");

        let e = env(json!({"ok": false, "result": {"details": {"error": "nested"}}}));
        assert_eq!(error_message(&e), "nested");

        let e = env(json!({"ok": false}));
        assert_eq!(error_message(&e), "Tool invoke failed");
    }

    #[test]
    fn test_expect_ok() {
        let e = env(json!({"ok": false, "error": "nope"}));
        let err = expect_ok(&e, "cron").unwrap_err();
        assert!(matches!(err, FiggyError::EnvelopeNotOk { ref tool, .. } if tool == "cron"));

        let e = env(json!({"ok": true, "result": {"k": "v"}}));
        assert_eq!(expect_ok(&e, "cron").unwrap()["k"], "v");
    }
}
