//! Configuration for the Fairylab runtime.
//!
//! Settings are layered with figment (defaults, profile file, main file,
//! `FAIRYLAB_*` environment variables) and checked by [`validate_config`]
//! before the runtime starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    FairylabConfig, KernelConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, RenderConfig,
    SlackConfig,
};
pub use validation::validate_config;
