//! Fairylab Runtime - process orchestration for the Fairylab bot.
//!
//! This crate provides:
//! - Layered configuration (`fairylab.toml`, profiles, `FAIRYLAB_*` env vars)
//! - Logging setup
//! - [`FairylabRuntime`]: the tick loop, the background task loop and the
//!   Slack socket loop around one locked kernel
//!
//! ```ignore
//! use fairylab_runtime::{FairylabRuntime, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = FairylabRuntime::builder(my_catalog()).build()?;
//!     if runtime.run().await? == RunOutcome::Reboot {
//!         return Err(fairylab_runtime::restart_process().into());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, FairylabConfig, KernelConfig, RenderConfig,
    SlackConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{FairylabRuntime, RunOutcome, RuntimeBuilder, restart_process};

// Re-export tracing for use by plugin crates
pub use tracing;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
