//! Error types for plugin installation.

use fairylab_core::PluginError;
use thiserror::Error;

/// Why a plugin could not be installed.
///
/// Install failures never touch other registered plugins; the failing name is
/// simply absent from the registry afterwards.
#[derive(Debug, Error)]
pub enum InstallError {
    /// No descriptor is registered under this path and name.
    #[error("no plugin '{name}' under '{path}'")]
    NotFound {
        /// Path segment (plugin package).
        path: String,
        /// Plugin name.
        name: String,
    },

    /// The descriptor builds a plugin whose class does not match the name.
    #[error("plugin '{name}' expected class '{expected}', found '{found}'")]
    ClassMismatch {
        name: String,
        expected: String,
        found: &'static str,
    },

    /// The factory returned an error.
    #[error("failed to construct plugin '{name}': {source}")]
    Construct {
        name: String,
        #[source]
        source: PluginError,
    },

    /// The factory or the `enabled` check panicked.
    #[error("plugin '{name}' panicked during install: {message}")]
    Panicked { name: String, message: String },

    /// The plugin reported itself as disabled.
    #[error("plugin '{name}' is not enabled")]
    Disabled { name: String },
}

/// Result type for install operations.
pub type InstallResult<T> = Result<T, InstallError>;
