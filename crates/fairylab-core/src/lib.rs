//! # Fairylab Core
//!
//! The vocabulary shared by the Fairylab kernel and every plugin.
//!
//! ## Layers
//!
//! ### Value layer
//!
//! - [`Response`]: what every plugin hook returns, carrying [`Notify`]
//!   signals, [`Shadow`] data handoffs, deferred [`Task`] requests and
//!   [`DebugEntry`] log lines.
//! - [`SlackMessage`]: an inbound socket event.
//!
//! ### Plugin contracts
//!
//! - [`Plugin`]: the registrable contract every plugin implements
//!   (setup / notify / shadow hooks, command table, `enabled` flag).
//! - [`Runnable`], [`Messageable`], [`Renderable`]: optional capabilities,
//!   exposed through `Plugin::as_*` accessors rather than inheritance.
//! - [`ErasedPlugin`] / [`BoxedPlugin`]: the type-erased form the kernel
//!   stores in its registry.
//!
//! ### Capabilities provided to plugins
//!
//! - [`Environment`]: template renderer, output roots, chat client.
//! - [`ChatClient`]: posting to Slack; implemented by `fairylab-transport`.
//!
//! ```text
//! ┌────────────┐  Call   ┌──────────────┐  hook   ┌─────────┐
//! │   Kernel   │────────▶│ ErasedPlugin │────────▶│ Plugin  │
//! │ (dispatch) │◀────────│ (Installed)  │◀────────│         │
//! └────────────┘ Response└──────────────┘ Response└─────────┘
//! ```

pub mod chat;
pub mod error;
pub mod message;
pub mod plugin;
pub mod render;
pub mod response;

pub use chat::{Attachment, ChatClient, MemoryChatClient, NullChatClient, PostedMessage};
pub use error::{ChatError, ChatResult, PluginError, PluginResult, RenderError, RenderResult};
pub use message::SlackMessage;
pub use plugin::{
    BoxedPlugin, Call, Command, CommandSyntax, CommandTable, ErasedPlugin, Exposure, HookContext,
    Installed, Invocation, Messageable, ParsedCommand, Plugin, Renderable, Runnable, ShadowMap,
};
pub use render::{Artifact, Environment, RenderMode, Renderer};
pub use response::{DebugEntry, Notify, Response, Shadow, Task};

/// Prelude for plugin authors.
pub mod prelude {
    pub use super::plugin::{
        Command, CommandTable, HookContext, Invocation, Messageable, Plugin, Renderable, Runnable,
    };
    pub use super::render::{Artifact, Environment};
    pub use super::response::{DebugEntry, Notify, Response, Shadow, Task};
    pub use super::{PluginError, PluginResult, SlackMessage};
}
