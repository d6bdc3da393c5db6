//! # Fairylab Framework
//!
//! The plugin orchestration kernel:
//!
//! - [`Fairylab`]: registry owner, hook dispatch with failure isolation,
//!   notify broadcast, shadow routing and task queueing.
//! - [`TaskQueue`] and [`drain`]: deferred work executed by the background
//!   loop one cycle after it was produced.
//! - [`PluginCatalog`]: compiled-in plugin descriptors, discovery and
//!   install / reload.
//!
//! The framework is synchronous. Threading and locking live in
//! `fairylab-runtime`.

pub mod catalog;
pub mod error;
pub mod kernel;
pub mod queue;
pub mod registry;

pub use catalog::{InstallContext, PluginCatalog, PluginDescriptor, capitalize};
pub use error::{InstallError, InstallResult};
pub use kernel::{DISPATCH_TARGET, Fairylab, HOME_TEMPLATE, KERNEL_CLASS, KernelSignal};
pub use queue::{QueuedTask, TaskQueue, drain};
pub use registry::{PluginStatus, Registry, RegistryEntry};
