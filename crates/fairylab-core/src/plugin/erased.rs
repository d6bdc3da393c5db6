//! The type-erased plugin form stored by the kernel.
//!
//! [`Installed`] wraps a concrete [`Plugin`] together with its command table,
//! chat syntax and shadow map, and implements the public hooks on top of the
//! plugin's `*_internal` hooks. The kernel only ever sees [`ErasedPlugin`].

use std::any::Any;
use std::fmt;

use chrono::{DateTime, Local};
use tracing::debug;

use super::capability::{self, Plugin};
use super::command::{CommandSyntax, CommandTable};
use super::context::{HookContext, Invocation, ShadowMap};
use crate::error::PluginResult;
use crate::message::SlackMessage;
use crate::render::Environment;
use crate::response::{Notify, Response, Shadow, Task};

// =============================================================================
// Call
// =============================================================================

/// A hook the kernel can dispatch to a plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Setup,
    Run,
    Notify(Notify),
    Shadow(Shadow),
    Message(SlackMessage),
    Render,
    /// Replay of a deferred task against the plugin's command table.
    Task(Task),
}

impl Call {
    /// Name of the hook, used in logs.
    pub fn hook_name(&self) -> &str {
        match self {
            Call::Setup => "setup",
            Call::Run => "run",
            Call::Notify(_) => "notify",
            Call::Shadow(_) => "shadow",
            Call::Message(_) => "on_message",
            Call::Render => "render",
            Call::Task(task) => &task.target,
        }
    }
}

// =============================================================================
// ErasedPlugin
// =============================================================================

/// Object-safe view of an installed plugin.
pub trait ErasedPlugin: Send {
    fn class_name(&self) -> &'static str;

    fn enabled(&self) -> bool;

    fn shadow_map(&self) -> &ShadowMap;

    /// Runs `call`.
    ///
    /// Returns `None` when the plugin does not implement the requested hook
    /// or command, which the kernel treats as "not applicable".
    fn invoke(
        &mut self,
        call: &Call,
        date: DateTime<Local>,
        env: &Environment,
    ) -> Option<PluginResult<Response>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Owned, type-erased plugin.
pub type BoxedPlugin = Box<dyn ErasedPlugin>;

impl dyn ErasedPlugin {
    /// Borrows the concrete plugin if it is a `P`.
    pub fn downcast_ref<P: Plugin>(&self) -> Option<&P> {
        self.as_any()
            .downcast_ref::<Installed<P>>()
            .map(|installed| &installed.plugin)
    }

    pub fn downcast_mut<P: Plugin>(&mut self) -> Option<&mut P> {
        self.as_any_mut()
            .downcast_mut::<Installed<P>>()
            .map(|installed| &mut installed.plugin)
    }
}

impl fmt::Debug for dyn ErasedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedPlugin")
            .field("class", &self.class_name())
            .field("shadow_keys", &self.shadow_map().len())
            .finish()
    }
}

// =============================================================================
// Installed
// =============================================================================

/// A concrete plugin plus the state the public hooks need.
pub struct Installed<P: Plugin> {
    plugin: P,
    commands: CommandTable<P>,
    syntax: CommandSyntax,
    shadow: ShadowMap,
}

impl<P: Plugin> Installed<P> {
    pub fn new(plugin: P) -> PluginResult<Self> {
        Ok(Self {
            plugin,
            commands: P::commands(),
            syntax: CommandSyntax::new(P::NAME)?,
            shadow: ShadowMap::new(),
        })
    }

    pub fn boxed(plugin: P) -> PluginResult<BoxedPlugin> {
        Ok(Box::new(Self::new(plugin)?))
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    // ─── Public hooks ────────────────────────────────────────────────────────

    fn setup(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response> {
        let mut response = self.plugin.setup_internal(ctx)?;
        response.shadow.extend(self.plugin.shadow_internal(ctx)?);
        Ok(response)
    }

    fn notify(&mut self, ctx: &HookContext<'_>, notify: Notify) -> PluginResult<Response> {
        let mut response = self.plugin.notify_internal(ctx, notify)?;
        if !response.notify.is_empty() {
            response.notify = vec![Notify::Base];
        }
        Ok(response)
    }

    fn on_message(
        &mut self,
        ctx: &HookContext<'_>,
        message: &SlackMessage,
    ) -> Option<PluginResult<Response>> {
        if let Some(parsed) = self.syntax.parse(&message.text) {
            if message.channel != ctx.env.testing_channel() {
                return Some(Ok(Response::new()));
            }
            let Some(command) = self.commands.get_public(&parsed.method).copied() else {
                return Some(Ok(Response::new()));
            };
            debug!(plugin = P::NAME, command = %parsed.method, "Running chat command");
            let inv = Invocation::from_chat(parsed.args, message);
            let result = command
                .call(&parsed.method, &mut self.plugin, ctx, &inv)
                .map(|mut response| {
                    response.notify = vec![Notify::Base];
                    response
                });
            return Some(result);
        }

        self.plugin
            .as_messageable()
            .map(|m| m.on_message_internal(ctx, message))
    }

    fn task(&mut self, ctx: &HookContext<'_>, task: &Task) -> Option<PluginResult<Response>> {
        let command = self.commands.get(&task.target).copied()?;
        Some(command.call(&task.target, &mut self.plugin, ctx, &Invocation::from_task(task)))
    }
}

impl<P: Plugin> ErasedPlugin for Installed<P> {
    fn class_name(&self) -> &'static str {
        P::NAME
    }

    fn enabled(&self) -> bool {
        self.plugin.enabled()
    }

    fn shadow_map(&self) -> &ShadowMap {
        &self.shadow
    }

    fn invoke(
        &mut self,
        call: &Call,
        date: DateTime<Local>,
        env: &Environment,
    ) -> Option<PluginResult<Response>> {
        if let Call::Shadow(shadow) = call {
            // Stored before the context borrows the map. Setup is re-run so the
            // plugin sees the new data, but its own shadows are not re-emitted.
            self.shadow.insert(shadow.key.clone(), shadow.data.clone());
        }

        let shadow = std::mem::take(&mut self.shadow);
        let ctx = HookContext::new(date, &shadow, env);

        let result = match call {
            Call::Setup => Some(self.setup(&ctx)),
            Call::Run => self.plugin.as_runnable().map(|r| r.run_internal(&ctx)),
            Call::Notify(notify) => Some(self.notify(&ctx, *notify)),
            Call::Shadow(_) => Some(self.plugin.setup_internal(&ctx)),
            Call::Message(message) => self.on_message(&ctx, message),
            Call::Render => self
                .plugin
                .as_renderable()
                .map(|r| capability::render(r, &ctx).map(|_| Response::new())),
            Call::Task(task) => self.task(&ctx, task),
        };

        self.shadow = shadow;
        result
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{Command, Messageable, Runnable};
    use serde_json::json;

    #[derive(Default)]
    struct Foo {
        bar_args: Vec<Vec<serde_json::Value>>,
        verbose: Vec<bool>,
        typed_in: Vec<String>,
        generic: usize,
        setups: usize,
        seen_shadow: Option<serde_json::Value>,
        var: u8,
    }

    impl Foo {
        fn bar(&mut self, _: &HookContext<'_>, inv: &Invocation) -> PluginResult<Response> {
            self.bar_args.push(inv.args.clone());
            self.verbose.push(inv.verbose());
            if let Some(message) = inv.message() {
                self.typed_in.push(message.channel.clone());
            }
            Ok(Response::new().with_notify([Notify::Other]))
        }

        fn _bar(&mut self, _: &HookContext<'_>, _: &Invocation) -> PluginResult<Response> {
            self.var += 1;
            Ok(Response::new())
        }
    }

    impl Plugin for Foo {
        const NAME: &'static str = "Foo";

        fn commands() -> CommandTable<Self> {
            CommandTable::new()
                .command("bar", Command::public(Foo::bar))
                .public("_bar", Foo::_bar)
                .internal("sync", Foo::_bar)
        }

        fn setup_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response> {
            self.setups += 1;
            self.seen_shadow = ctx.shadow.get("k").cloned();
            Ok(Response::new())
        }

        fn shadow_internal(&mut self, _: &HookContext<'_>) -> PluginResult<Vec<Shadow>> {
            Ok(vec![Shadow::new("Other", "k", json!(1))])
        }

        fn notify_internal(&mut self, _: &HookContext<'_>, notify: Notify) -> PluginResult<Response> {
            Ok(Response::new().with_notify([notify]))
        }

        fn as_messageable(&mut self) -> Option<&mut dyn Messageable> {
            Some(self)
        }
    }

    impl Messageable for Foo {
        fn on_message_internal(
            &mut self,
            _: &HookContext<'_>,
            _: &SlackMessage,
        ) -> PluginResult<Response> {
            self.generic += 1;
            Ok(Response::new())
        }
    }

    fn env() -> Environment {
        Environment::default().with_testing_channel("G-testing")
    }

    fn installed() -> Installed<Foo> {
        Installed::new(Foo::default()).unwrap()
    }

    fn message(installed: &mut Installed<Foo>, channel: &str, text: &str) -> Response {
        installed
            .invoke(&Call::Message(SlackMessage::text(channel, text)), Local::now(), &env())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_chat_command_invokes_public_method() {
        let mut foo = installed();
        let response = message(&mut foo, "G-testing", "Foo.bar(a,b)");

        assert_eq!(foo.plugin().bar_args, vec![vec![json!("a"), json!("b")]]);
        assert_eq!(foo.plugin().verbose, vec![true]);
        assert_eq!(foo.plugin().typed_in, vec!["G-testing"]);
        assert_eq!(response.notify, vec![Notify::Base]);
        assert_eq!(foo.plugin().generic, 0);
    }

    #[test]
    fn test_chat_command_rejects_private_and_unknown() {
        let mut foo = installed();
        assert_eq!(message(&mut foo, "G-testing", "Foo._bar()"), Response::new());
        assert_eq!(message(&mut foo, "G-testing", "Foo.var()"), Response::new());
        assert_eq!(message(&mut foo, "G-testing", "Foo.sync()"), Response::new());
        assert_eq!(foo.plugin().var, 0);
        assert_eq!(foo.plugin().generic, 0);
    }

    #[test]
    fn test_chat_command_outside_testing_channel_is_ignored() {
        let mut foo = installed();
        assert_eq!(message(&mut foo, "C-general", "Foo.bar(a,b)"), Response::new());
        assert!(foo.plugin().bar_args.is_empty());
        assert_eq!(foo.plugin().generic, 0);
    }

    #[test]
    fn test_plain_message_falls_through() {
        let mut foo = installed();
        message(&mut foo, "C-general", "good game tonight");
        message(&mut foo, "G-testing", "Bar.bar(a)");
        assert_eq!(foo.plugin().generic, 2);
    }

    #[test]
    fn test_notify_collapses_to_base() {
        let mut foo = installed();
        let response = foo
            .invoke(&Call::Notify(Notify::StatsplusSim), Local::now(), &env())
            .unwrap()
            .unwrap();
        assert_eq!(response.notify, vec![Notify::Base]);
    }

    #[test]
    fn test_setup_emits_shadows_but_shadow_delivery_does_not() {
        let mut foo = installed();
        let setup = foo.invoke(&Call::Setup, Local::now(), &env()).unwrap().unwrap();
        assert_eq!(setup.shadow.len(), 1);

        let delivered = foo
            .invoke(&Call::Shadow(Shadow::new("Foo", "k", json!("v"))), Local::now(), &env())
            .unwrap()
            .unwrap();
        assert!(delivered.shadow.is_empty());
        assert_eq!(foo.plugin().setups, 2);
        assert_eq!(foo.plugin().seen_shadow, Some(json!("v")));
        assert_eq!(foo.shadow_map().get("k"), Some(&json!("v")));
    }

    #[test]
    fn test_task_reaches_internal_commands_only_by_name() {
        let mut foo = installed();
        let call = Call::Task(Task::new("sync"));
        assert!(foo.invoke(&call, Local::now(), &env()).unwrap().is_ok());
        assert_eq!(foo.plugin().var, 1);

        let missing = Call::Task(Task::new("nope"));
        assert!(foo.invoke(&missing, Local::now(), &env()).is_none());
    }

    #[test]
    fn test_missing_capabilities_are_not_applicable() {
        let mut foo = installed();
        assert!(foo.invoke(&Call::Run, Local::now(), &env()).is_none());
        assert!(foo.invoke(&Call::Render, Local::now(), &env()).is_none());
    }

    #[test]
    fn test_downcast() {
        let boxed: BoxedPlugin = Installed::boxed(Foo::default()).unwrap();
        assert!(boxed.downcast_ref::<Foo>().is_some());
        assert_eq!(boxed.class_name(), "Foo");
    }

    struct Ticker;

    impl Plugin for Ticker {
        const NAME: &'static str = "Ticker";

        fn as_runnable(&mut self) -> Option<&mut dyn Runnable> {
            Some(self)
        }
    }

    impl Runnable for Ticker {
        fn run_internal(&mut self, _: &HookContext<'_>) -> PluginResult<Response> {
            Ok(Response::base())
        }
    }

    #[test]
    fn test_run_dispatches_to_runnable() {
        let mut ticker = Installed::new(Ticker).unwrap();
        let response = ticker.invoke(&Call::Run, Local::now(), &env()).unwrap().unwrap();
        assert_eq!(response, Response::base());
    }
}
