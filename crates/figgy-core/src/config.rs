//! Settings loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FiggyError, Result};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:18789";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_FAN_OUT: usize = 8;

/// Top-level Figgy settings, read from `~/.figgy/config.json` (JSON5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub logs: LogsSettings,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the OpenClaw gateway.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Per-call bound for `/tools/invoke`.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token: None,
            token_env: None,
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl GatewaySettings {
    /// Resolve the bearer token from the direct value or the env-var reference.
    pub fn resolve_token(&self) -> Option<String> {
        resolve_secret_field(&self.token, &self.token_env)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.into()
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS (the web UI dev server by default).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".into(),
        "http://127.0.0.1:5173".into(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsSettings {
    /// How many session histories a log query fetches at once (1 = serial).
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,
}

impl Default for LogsSettings {
    fn default() -> Self {
        Self {
            fan_out: default_fan_out(),
        }
    }
}

fn default_fan_out() -> usize {
    DEFAULT_FAN_OUT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "figgy_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| FiggyError::Config(e.to_string()))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

impl Settings {
    /// Load settings from a JSON5 file, substituting `${ENV_VAR}` references,
    /// then apply environment overrides. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::parse(&raw)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Parse settings from JSON5 text.
    pub fn parse(raw: &str) -> Result<Self> {
        let substituted = substitute_env_vars(raw)?;
        json5::from_str(&substituted).map_err(|e| FiggyError::Config(e.to_string()))
    }

    /// `OPENCLAW_GATEWAY_URL`, `OPENCLAW_GATEWAY_TOKEN` and `FIGGY_PORT` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("OPENCLAW_GATEWAY_URL") {
            if !url.is_empty() {
                self.gateway.url = url;
            }
        }
        if let Ok(token) = std::env::var("OPENCLAW_GATEWAY_TOKEN") {
            if !token.is_empty() {
                self.gateway.token = Some(token);
            }
        }
        if let Some(port) = std::env::var("FIGGY_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            self.server.port = port;
        }
    }

    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Gateway base URL without a trailing slash.
    pub fn gateway_url(&self) -> &str {
        self.gateway.url.trim_end_matches('/')
    }

    /// Validate settings, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let url = self.gateway.url.trim();
        if url.is_empty() {
            errors.push("Gateway URL is empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("Gateway URL must be http(s): {url}"));
        }

        if self.gateway.resolve_token().is_none() {
            warnings.push("No gateway token configured; requests are sent unauthenticated".into());
        }

        if self.gateway.tool_timeout_secs == 0 {
            errors.push("gateway.tool_timeout_secs cannot be 0".to_string());
        }

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if self.logs.fan_out == 0 {
            errors.push("logs.fan_out must be at least 1".to_string());
        }

        (warnings, errors)
    }
}

/// Base directory for Figgy data: `~/.figgy/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".figgy")
}

/// Expand `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
