//! Errors raised while loading or checking `fairylab.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// No loader is compiled in for the file's extension.
    #[error("no loader for {}; enable the matching config feature", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The merged sources do not deserialise into a [`FairylabConfig`](super::FairylabConfig).
    #[error("cannot load configuration: {0}")]
    Load(String),

    /// A setting that must be present is empty.
    #[error("`{field}` must be set")]
    MissingField { field: &'static str },

    /// A setting is present but unusable.
    #[error("`{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// The dotted path of the offending setting, for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field } | Self::Invalid { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_setting() {
        let err = ConfigError::invalid("kernel.tick_interval_secs", "must be greater than 0");
        assert_eq!(
            err.to_string(),
            "`kernel.tick_interval_secs` is invalid: must be greater than 0"
        );
        assert_eq!(err.field(), Some("kernel.tick_interval_secs"));
        assert_eq!(ConfigError::Load("bad".into()).field(), None);
    }
}
