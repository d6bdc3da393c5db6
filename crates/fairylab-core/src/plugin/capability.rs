use std::path::PathBuf;

use super::command::CommandTable;
use super::context::HookContext;
use crate::chat::Attachment;
use crate::error::PluginResult;
use crate::message::SlackMessage;
use crate::render::{self, Artifact, Environment};
use crate::response::{Notify, Response, Shadow};

// =============================================================================
// Plugin
// =============================================================================

/// The contract every registrable plugin implements.
///
/// All hooks have empty defaults, so a plugin only overrides what it uses.
/// A hook returning `Err` (or panicking) disables the plugin until it is
/// reloaded.
pub trait Plugin: Send + Sized + 'static {
    /// Class name used for the chat command syntax and discovery.
    const NAME: &'static str;

    /// Commands reachable from chat or as deferred tasks.
    fn commands() -> CommandTable<Self> {
        CommandTable::new()
    }

    /// Evaluated once at install time; `false` keeps the plugin out of the
    /// registry.
    fn enabled(&self) -> bool {
        true
    }

    fn setup_internal(&mut self, _ctx: &HookContext<'_>) -> PluginResult<Response> {
        Ok(Response::new())
    }

    /// Reacts to a broadcast signal.
    fn notify_internal(&mut self, _ctx: &HookContext<'_>, _notify: Notify) -> PluginResult<Response> {
        Ok(Response::new())
    }

    /// Shadows this plugin hands to others on every setup.
    fn shadow_internal(&mut self, _ctx: &HookContext<'_>) -> PluginResult<Vec<Shadow>> {
        Ok(Vec::new())
    }

    fn as_runnable(&mut self) -> Option<&mut dyn Runnable> {
        None
    }

    fn as_messageable(&mut self) -> Option<&mut dyn Messageable> {
        None
    }

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        None
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Periodic work, called on every tick.
pub trait Runnable {
    fn run_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response>;
}

/// Generic handling of chat messages that are not explicit commands.
pub trait Messageable {
    fn on_message_internal(
        &mut self,
        ctx: &HookContext<'_>,
        message: &SlackMessage,
    ) -> PluginResult<Response>;
}

/// A plugin that owns one or more HTML pages.
pub trait Renderable {
    /// Page title.
    fn title(&self) -> &str;

    /// Path of the plugin's main page, relative to the HTML root.
    fn html(&self) -> &str;

    fn render_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Vec<Artifact>>;

    /// A chat attachment pointing at this plugin's page.
    fn attachment(&self, env: &Environment, text: &str) -> Attachment {
        render::attachment(env, self.title(), self.html(), text)
    }
}

/// Renders every artifact of `plugin`, best-effort per artifact.
///
/// Only a failing `render_internal` is an error.
pub fn render<R>(plugin: &mut R, ctx: &HookContext<'_>) -> PluginResult<Vec<PathBuf>>
where
    R: Renderable + ?Sized,
{
    let artifacts = plugin.render_internal(ctx)?;
    Ok(render::render_artifacts(
        ctx.env,
        plugin.title(),
        ctx.date,
        artifacts,
    ))
}
