//! # Fairylab
//!
//! A plugin orchestration kernel for a Slack bot that runs a simulated
//! baseball league.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────────────────────┐
//! │   Runtime    │────▶│    Kernel     │────▶│ Plugin "scoreboard"         │
//! │ tick / socket│     │   dispatch    │────▶│ Plugin "digest"             │
//! │ background   │     │               │────▶│ Plugin ...                  │
//! └──────────────┘     └───────────────┘     └─────────────────────────────┘
//!        ▲                 │ notify (broadcast)
//!        │                 │ shadow (point to point)
//!        └── task queue ◀──┘ task   (deferred)
//! ```
//!
//! - **Runtime**: configuration, logging, the three loops and the coarse lock
//! - **Kernel**: the registry, failure isolation and response fan-out
//! - **Plugins**: independent units returning a `Response` from every hook
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fairylab::prelude::*;
//!
//! #[derive(Default)]
//! struct Pinger;
//!
//! impl Plugin for Pinger {
//!     const NAME: &'static str = "Pinger";
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = PluginCatalog::new()
//!         .with(PluginDescriptor::new("plugin", "pinger", |_| Ok(Pinger)));
//!     let runtime = FairylabRuntime::builder(catalog).build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): `fairylab.toml` configuration files
//! - `yaml-config`: `fairylab.yaml` configuration files
//! - `json-log`: JSON log output

pub use fairylab_core as core;
pub use fairylab_framework as framework;
pub use fairylab_runtime as runtime;
pub use fairylab_transport as transport;

/// Everything a plugin crate or bot binary usually needs.
pub mod prelude {
    pub use fairylab_core::prelude::*;
    pub use fairylab_core::{Call, Exposure, RenderMode};

    pub use fairylab_framework::{
        Fairylab, InstallContext, KernelSignal, PluginCatalog, PluginDescriptor, TaskQueue,
    };

    pub use fairylab_runtime::{
        FairylabConfig, FairylabRuntime, RunOutcome, RuntimeError, RuntimeResult,
        restart_process,
    };

    pub use fairylab_runtime::prelude::*;
}
