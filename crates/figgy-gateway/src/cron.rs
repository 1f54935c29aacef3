//! Cron scheduler pass-through.
//!
//! Jobs live in the gateway; this only forwards calls to the `cron` tool and
//! normalizes the replies. Job ids arrive as either `id` or `jobId`.

use serde_json::{Value, json};

use figgy_core::error::{FiggyError, Result};
use figgy_core::types::{GatewayEnvelope, Payload};

use crate::envelope;
use crate::transport::{GatewayTransport, ToolInvocation};

const TOOL: &str = "cron";

pub struct CronClient<'a> {
    transport: &'a dyn GatewayTransport,
}

impl<'a> CronClient<'a> {
    pub fn new(transport: &'a dyn GatewayTransport) -> Self {
        Self { transport }
    }

    async fn call(&self, action: &str, args: Payload) -> Result<GatewayEnvelope> {
        let invocation = ToolInvocation::new(TOOL).args(args).arg("action", action);
        self.transport.invoke(&invocation).await
    }

    pub async fn status(&self) -> Result<Payload> {
        let envelope = self.call("status", Payload::new()).await?;
        Ok(envelope::payload_or(&envelope, object(json!({"ok": false}))))
    }

    pub async fn list(&self, include_disabled: bool) -> Result<Payload> {
        let mut args = Payload::new();
        if include_disabled {
            args.insert("includeDisabled".into(), Value::Bool(true));
        }
        let envelope = self.call("list", args).await?;
        Ok(envelope::payload_or(&envelope, object(json!({"jobs": []}))))
    }

    pub async fn add(&self, job: Payload) -> Result<Payload> {
        let mut args = Payload::new();
        args.insert("job".into(), Value::Object(job));
        let envelope = self.call("add", args).await?;
        envelope::expect_ok(&envelope, TOOL)
    }

    pub async fn update(&self, job_id: &str, patch: Payload) -> Result<Payload> {
        let mut args = job_args(job_id);
        args.insert("patch".into(), Value::Object(patch));
        let envelope = self.call("update", args).await?;
        envelope::expect_ok(&envelope, TOOL)
    }

    pub async fn remove(&self, job_id: &str) -> Result<Payload> {
        let envelope = self.call("remove", job_args(job_id)).await?;
        envelope::expect_ok(&envelope, TOOL)
    }

    /// Trigger a job immediately.
    pub async fn run(&self, job_id: &str) -> Result<Payload> {
        let envelope = self.call("run", job_args(job_id)).await?;
        envelope::expect_ok(&envelope, TOOL)
    }

    /// Run history of a job.
    pub async fn runs(&self, job_id: &str) -> Result<Payload> {
        let envelope = self.call("runs", job_args(job_id)).await?;
        Ok(envelope::payload_or(&envelope, object(json!({"runs": []}))))
    }

    pub async fn pause(&self, job_id: &str) -> Result<Payload> {
        self.update(job_id, object(json!({"enabled": false}))).await
    }

    pub async fn resume(&self, job_id: &str) -> Result<Payload> {
        self.update(job_id, object(json!({"enabled": true}))).await
    }

    /// Look a job up by `id` or `jobId`, including disabled jobs.
    pub async fn find_job(&self, job_id: &str) -> Result<Payload> {
        let listing = self.list(true).await?;
        listing
            .get("jobs")
            .and_then(Value::as_array)
            .and_then(|jobs| jobs.iter().find(|job| job_matches(job, job_id)))
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| FiggyError::NotFound(format!("cron job '{job_id}'")))
    }
}

fn job_args(job_id: &str) -> Payload {
    let mut args = Payload::new();
    args.insert("jobId".into(), Value::String(job_id.to_string()));
    args
}

fn job_matches(job: &Value, job_id: &str) -> bool {
    ["id", "jobId"]
        .iter()
        .any(|k| job.get(*k).and_then(Value::as_str) == Some(job_id))
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
