//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running the bot process.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] fairylab_core::RenderError),

    #[error(transparent)]
    Transport(#[from] fairylab_transport::TransportError),

    /// A blocking kernel pass panicked or was cancelled.
    #[error("Kernel task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("cannot open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
