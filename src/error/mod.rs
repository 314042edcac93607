//! Error types for flowstream.

use thiserror::Error;

/// Primary error type for all flowstream operations.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A single data line failed to parse. Recoverable: the session keeps
    /// processing subsequent lines.
    #[error("Malformed frame: {source}")]
    Frame {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The upstream emitted an `error` event. Terminal for the session.
    #[error("Workflow error event: {message}")]
    Protocol {
        message: String,
        code: Option<String>,
    },
}

impl FlowError {
    /// Create an API error without a structured code.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            code: None,
        }
    }

    /// Whether this error terminates the session.
    ///
    /// Everything except a per-line [`FlowError::Frame`] failure is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Frame { .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FlowError>;
