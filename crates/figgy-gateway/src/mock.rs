//! In-memory [`GatewayTransport`] driven by a closure, for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use figgy_core::error::Result;
use figgy_core::types::GatewayEnvelope;

use crate::transport::{GatewayTransport, ToolInvocation};

type Handler = dyn Fn(&ToolInvocation) -> Result<GatewayEnvelope> + Send + Sync;

/// Answers every invocation with `handler` and records what it was asked.
pub struct MockGateway {
    handler: Box<Handler>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl MockGateway {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ToolInvocation) -> Result<GatewayEnvelope> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation received so far, in arrival order.
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn calls_to(&self, tool: &str) -> Vec<ToolInvocation> {
        self.calls().into_iter().filter(|c| c.tool == tool).collect()
    }
}

#[async_trait]
impl GatewayTransport for MockGateway {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<GatewayEnvelope> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invocation.clone());
        (self.handler)(invocation)
    }
}

/// `{ok: true, result}`.
pub fn ok(result: Value) -> GatewayEnvelope {
    GatewayEnvelope {
        ok: true,
        result: Some(result),
        error: None,
    }
}

/// `{ok: false, error: message}`.
pub fn not_ok(message: &str) -> GatewayEnvelope {
    GatewayEnvelope {
        ok: false,
        result: None,
        error: Some(json!(message)),
    }
}

/// String argument of an invocation.
pub fn arg_str<'a>(invocation: &'a ToolInvocation, key: &str) -> Option<&'a str> {
    invocation.args.get(key).and_then(Value::as_str)
}
