//! Transport error types.

use fairylab_core::ChatError;
use thiserror::Error;

/// Errors raised by the Slack socket and Web API clients.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// An HTTP request failed before Slack answered.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Slack answered with `ok: false`.
    #[error("slack method '{method}' failed: {error}")]
    Api { method: String, error: String },

    /// The reply could not be decoded.
    #[error("invalid response from '{method}': {reason}")]
    InvalidResponse { method: String, reason: String },

    /// No async runtime is available to drive the client.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Reconnection gave up after the configured number of attempts.
    #[error("gave up after {attempts} reconnection attempt(s)")]
    RetriesExhausted { attempts: u32 },
}

impl From<TransportError> for ChatError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Api { method, error } => ChatError::Api { method, error },
            other => ChatError::Request(other.to_string()),
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
