//! Error types for openai-proxy.

/// Result type alias for openai-proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for openai-proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Upstream reported success but the payload is unusable.
    #[error("System error: {0}")]
    System(String),
}

impl Error {
    /// Upstream HTTP status, when the error came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
