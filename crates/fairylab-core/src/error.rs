//! Error types shared by plugins and the kernel.
//!
//! Hook failures are reported through [`PluginError`]. The kernel treats any
//! `Err` returned from a hook as the plugin failing and disables it, so
//! plugins should only return an error for conditions they cannot recover
//! from on the next tick.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Rendering Errors
// =============================================================================

/// Errors raised while rendering a template to disk.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template lookup, parsing or evaluation failed.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// The artifact could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The render context was not a JSON object.
    #[error("render context for '{template}' must be an object")]
    Context {
        /// Template the context was meant for.
        template: String,
    },
}

// =============================================================================
// Chat Errors
// =============================================================================

/// Errors raised by a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// No credentials were configured for the client.
    #[error("chat client is not configured")]
    NotConfigured,

    /// The request never produced a response.
    #[error("chat request failed: {0}")]
    Request(String),

    /// Slack answered with `ok: false`.
    #[error("slack method '{method}' failed: {error}")]
    Api {
        /// Web API method that was called.
        method: String,
        /// The `error` field of the reply.
        error: String,
    },
}

// =============================================================================
// Plugin Errors
// =============================================================================

/// Errors a plugin hook or command can fail with.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Generic failure with a message.
    #[error("{0}")]
    Failed(String),

    /// A command was invoked with the wrong number of positional arguments.
    #[error("command '{command}' expects {expected} argument(s), got {got}")]
    Arity {
        /// Command name.
        command: String,
        /// Declared arity.
        expected: usize,
        /// Number of arguments supplied.
        got: usize,
    },

    /// A command argument could not be interpreted.
    #[error("invalid argument for '{command}': {reason}")]
    InvalidArgument {
        /// Command name.
        command: String,
        /// Why the argument was rejected.
        reason: String,
    },

    /// The command syntax matcher for the plugin could not be built.
    #[error("invalid command syntax: {0}")]
    CommandSyntax(#[from] regex::Error),

    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Posting to chat failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// I/O error while reading or writing plugin state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Plugin state could not be (de)serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    /// Creates a generic failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for plugin hooks and commands.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
