//! Plugin contracts.
//!
//! A plugin is a plain struct implementing [`Plugin`]. Optional behaviour is
//! added by implementing [`Runnable`], [`Messageable`] or [`Renderable`] and
//! returning `Some(self)` from the matching `as_*` accessor. The public hooks
//! the kernel calls (`setup`, `notify`, `run`, `shadow`, `on_message`,
//! `render`) are implemented once in [`Installed`] and cannot be overridden.
//!
//! # Example
//!
//! ```rust
//! use fairylab_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Pinger {
//!     count: u32,
//! }
//!
//! impl Pinger {
//!     fn ping(&mut self, _ctx: &HookContext<'_>, _inv: &Invocation) -> PluginResult<Response> {
//!         self.count += 1;
//!         Ok(Response::base())
//!     }
//! }
//!
//! impl Plugin for Pinger {
//!     const NAME: &'static str = "Pinger";
//!
//!     fn commands() -> CommandTable<Self> {
//!         CommandTable::new().public("ping", Self::ping)
//!     }
//!
//!     fn as_runnable(&mut self) -> Option<&mut dyn Runnable> {
//!         Some(self)
//!     }
//! }
//!
//! impl Runnable for Pinger {
//!     fn run_internal(&mut self, _ctx: &HookContext<'_>) -> PluginResult<Response> {
//!         Ok(Response::new())
//!     }
//! }
//! ```

mod capability;
mod command;
mod context;
mod erased;

pub use capability::{Messageable, Plugin, Renderable, Runnable, render};
pub use command::{Command, CommandFn, CommandSyntax, CommandTable, Exposure, ParsedCommand};
pub use context::{HookContext, Invocation, ShadowMap};
pub use erased::{BoxedPlugin, Call, ErasedPlugin, Installed};
