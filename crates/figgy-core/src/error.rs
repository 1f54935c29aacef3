use thiserror::Error;

#[derive(Debug, Error)]
pub enum FiggyError {
    /// The gateway answered with a non-2xx status.
    #[error("Gateway returned HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Network failure, timeout, or an undecodable response body.
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway replied 2xx but the envelope carried `ok: false`.
    #[error("Gateway tool '{tool}' failed: {message}")]
    EnvelopeNotOk { tool: String, message: String },

    /// A config patch was submitted against a hash the gateway no longer holds.
    #[error("Config hash is stale: {message}")]
    StaleHash { message: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FiggyError {
    /// True for failures talking to the gateway at the HTTP level.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Http(_))
    }

    /// True when a config patch should be re-based on a fresh `config.get`.
    pub fn is_stale_hash(&self) -> bool {
        matches!(self, Self::StaleHash { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect())
    }
}

pub type Result<T> = std::result::Result<T, FiggyError>;
