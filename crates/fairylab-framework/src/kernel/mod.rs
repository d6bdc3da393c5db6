//! The Fairylab kernel.
//!
//! [`Fairylab`] owns the plugin registry and drives every plugin hook through
//! [`dispatch`](Fairylab::dispatch), the single place where hook failures are
//! contained and where a [`Response`](fairylab_core::Response) is turned into
//! follow-on work:
//!
//! ```text
//! dispatch(name, call)
//!   ├─ skip if absent, disabled, or hook not implemented
//!   ├─ invoke (errors and panics → ok = false, date = call date)
//!   ├─ notify non-empty        → date = call date
//!   ├─ notify X (X ≠ BASE)     → broadcast Notify(X) to every plugin
//!   ├─ shadow (dest, key, v)   → dispatch(dest, Shadow)
//!   └─ task                    → queue (name, task)
//! ```
//!
//! The kernel itself is not synchronised. The runtime wraps it in a single
//! coarse mutex that is held for a whole tick or message pass.

mod admin;
pub mod fault;
mod home;


use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use fairylab_core::{Call, CommandSyntax, Environment, Notify, SlackMessage};
use serde_json::{Map, Value};
use tracing::{Level, debug, error, info, span};

use crate::catalog::{InstallContext, PluginCatalog, capitalize};
use crate::error::{InstallError, InstallResult};
use crate::queue::TaskQueue;
use crate::registry::{PluginStatus, Registry};

pub use admin::KERNEL_CLASS;
pub use home::HOME_TEMPLATE;

/// Target of the per-hook `dispatch` span, for filtering hook traces.
pub const DISPATCH_TARGET: &str = "fairylab::dispatch";

/// A process-level request raised by an admin command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelSignal {
    /// Restart the whole process.
    Reboot,
    /// Exit cleanly.
    Shutdown,
}

/// The plugin orchestration kernel.
pub struct Fairylab {
    registry: Registry,
    catalog: PluginCatalog,
    queue: TaskQueue,
    env: Arc<Environment>,
    plugin_configs: HashMap<String, Value>,
    plugin_dir: Option<PathBuf>,
    admin: Option<CommandSyntax>,
    last_tick: Option<DateTime<Local>>,
    signal: Option<KernelSignal>,
}

impl Fairylab {
    pub fn new(catalog: PluginCatalog, env: Arc<Environment>) -> Self {
        fault::install_panic_hook();
        Self {
            registry: Registry::new(),
            catalog,
            queue: TaskQueue::new(),
            env,
            plugin_configs: HashMap::new(),
            plugin_dir: None,
            admin: CommandSyntax::new(KERNEL_CLASS).ok(),
            last_tick: None,
            signal: None,
        }
    }

    /// Sets the per-plugin config tables, keyed by plugin name.
    pub fn with_plugin_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.plugin_configs = configs;
        self
    }

    /// Restricts discovery to plugins with a directory below `dir`.
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = Some(dir.into());
        self
    }

    /// Shares an existing queue instead of the kernel's own.
    pub fn with_queue(mut self, queue: TaskQueue) -> Self {
        self.queue = queue;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn status(&self) -> Vec<PluginStatus> {
        self.registry.status()
    }

    /// Returns and clears the pending admin signal.
    pub fn take_signal(&mut self) -> Option<KernelSignal> {
        self.signal.take()
    }

    pub fn pending_signal(&self) -> Option<KernelSignal> {
        self.signal
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Installs every discovered plugin, then sets them all up.
    ///
    /// Individual install or setup failures are contained; the pass always
    /// completes.
    pub fn setup(&mut self, date: DateTime<Local>) {
        let discovered: Vec<(&'static str, &'static str)> = self
            .catalog
            .discover(self.plugin_dir.as_deref())
            .into_iter()
            .map(|d| (d.path, d.name))
            .collect();
        info!(count = discovered.len(), "Discovered plugins");

        for (path, name) in discovered {
            // Failures are logged by install and leave the plugin unregistered.
            let _ = self.install(path, name, date);
        }

        self.last_tick = Some(date);
        self.broadcast(Call::Setup, Some(date));
        self.broadcast(Call::Render, Some(date));
        self.render_home(date);
    }

    /// Instantiates a plugin and stores it, replacing any previous instance.
    ///
    /// On failure the name is removed from the registry.
    pub fn install(&mut self, path: &str, name: &str, date: DateTime<Local>) -> InstallResult<()> {
        match self.try_install(path, name, date) {
            Ok(()) => {
                info!(plugin = %name, "Plugin installed");
                Ok(())
            }
            Err(e) => {
                match &e {
                    InstallError::Disabled { .. } => info!(plugin = %name, "Plugin disabled"),
                    _ => error!(
                        plugin = %name,
                        error = %e,
                        causes = ?fault::causes(&e),
                        "Failed to install plugin"
                    ),
                }
                self.registry.remove(name);
                Err(e)
            }
        }
    }

    fn try_install(&mut self, path: &str, name: &str, date: DateTime<Local>) -> InstallResult<()> {
        let descriptor = self
            .catalog
            .find(path, name)
            .cloned()
            .ok_or_else(|| InstallError::NotFound {
                path: path.to_owned(),
                name: name.to_owned(),
            })?;

        let expected = capitalize(descriptor.name);
        if descriptor.class != expected {
            return Err(InstallError::ClassMismatch {
                name: descriptor.name.to_owned(),
                expected,
                found: descriptor.class,
            });
        }

        let config = self
            .plugin_configs
            .get(descriptor.name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let ctx = InstallContext::new(date, Arc::clone(&self.env), config);

        let panicked = |report: fault::PanicReport| InstallError::Panicked {
            name: descriptor.name.to_owned(),
            message: report.to_string(),
        };

        let plugin = fault::catch(|| descriptor.instantiate(&ctx))
            .map_err(panicked)?
            .map_err(|source| InstallError::Construct {
                name: descriptor.name.to_owned(),
                source,
            })?;

        let enabled = fault::catch(|| plugin.enabled()).map_err(panicked)?;
        if !enabled {
            return Err(InstallError::Disabled {
                name: descriptor.name.to_owned(),
            });
        }

        self.registry.insert(descriptor.name, plugin, date);
        Ok(())
    }

    /// Reinstalls a plugin and, on success, re-runs setup on every plugin so
    /// shadow consumers pick up fresh data.
    pub fn reload(&mut self, path: &str, name: &str, date: DateTime<Local>) -> InstallResult<()> {
        let result = self.install(path, name, date);
        match &result {
            Ok(()) => {
                info!(plugin = %name, "Plugin reloaded");
                self.broadcast(Call::Setup, Some(date));
            }
            Err(e) => error!(
                plugin = %name,
                error = %e,
                causes = ?fault::causes(e),
                "Plugin reload failed"
            ),
        }
        result
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Invokes one hook on one plugin and fans out its response.
    ///
    /// Never fails: a missing or disabled plugin, or a hook the plugin does
    /// not implement, is a silent no-op, and a failing hook disables the
    /// plugin.
    pub fn dispatch(&mut self, name: &str, call: Call, date: Option<DateTime<Local>>) {
        let date = date.unwrap_or_else(Local::now);
        let env = Arc::clone(&self.env);

        let Some(entry) = self.registry.get_mut(name) else {
            return;
        };
        if !entry.ok {
            return;
        }

        let span = span!(
            target: DISPATCH_TARGET,
            Level::DEBUG,
            "dispatch",
            plugin = %name,
            hook = %call.hook_name()
        );
        let _enter = span.enter();

        let response = match fault::catch(|| entry.plugin.invoke(&call, date, &env)) {
            Ok(None) => return,
            Ok(Some(Ok(response))) => response,
            Ok(Some(Err(e))) => {
                error!(
                    plugin = %name,
                    hook = %call.hook_name(),
                    error = %e,
                    causes = ?fault::causes(&e),
                    "Plugin hook failed, disabling plugin"
                );
                entry.ok = false;
                entry.date = date;
                return;
            }
            Err(panic) => {
                error!(
                    plugin = %name,
                    hook = %call.hook_name(),
                    error = %panic.message,
                    location = panic.location.as_deref().unwrap_or("unknown"),
                    backtrace = panic.backtrace.as_deref().unwrap_or("not captured"),
                    "Plugin hook panicked, disabling plugin"
                );
                entry.ok = false;
                entry.date = date;
                return;
            }
        };

        if !response.notify.is_empty() {
            entry.date = date;
        }

        for d in &response.debug {
            if d.extra.is_empty() {
                info!(plugin = %name, "{}", d.msg);
            } else {
                info!(plugin = %name, extra = %serde_json::Value::Object(d.extra.clone()), "{}", d.msg);
            }
        }

        for notify in response.notify {
            if !notify.is_base() {
                debug!(plugin = %name, notify = %notify, "Broadcasting notify");
                self.broadcast(Call::Notify(notify), Some(date));
            }
        }

        for shadow in response.shadow {
            let destination = shadow.destination.clone();
            self.dispatch(&destination, Call::Shadow(shadow), Some(date));
        }

        for task in response.task {
            debug!(plugin = %name, task = %task.target, "Queueing task");
            self.queue.push(name, task);
        }
    }

    /// Dispatches `call` to every registered plugin, in registry order.
    pub fn broadcast(&mut self, call: Call, date: Option<DateTime<Local>>) {
        let date = date.unwrap_or_else(Local::now);
        for name in self.registry.names() {
            self.dispatch(&name, call.clone(), Some(date));
        }
    }

    // =========================================================================
    // Event entry points
    // =========================================================================

    /// One periodic pass: `run` on every plugin, a day-change broadcast when
    /// the calendar date moved on, then the home page.
    pub fn tick(&mut self, now: DateTime<Local>) {
        self.broadcast(Call::Run, Some(now));

        if let Some(last) = self.last_tick
            && now.date_naive() > last.date_naive()
        {
            info!(day = %now.date_naive(), "New day");
            self.broadcast(Call::Notify(Notify::FairylabDay), Some(now));
        }
        self.last_tick = Some(now);

        self.render_home(now);
    }

    /// Handles one raw socket frame.
    pub fn on_message_received(&mut self, raw: &str, date: Option<DateTime<Local>>) {
        let message = match SlackMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable socket frame");
                return;
            }
        };
        if !message.is_message() {
            debug!(kind = %message.kind, "Ignoring non-message event");
            return;
        }
        let date = date.unwrap_or_else(Local::now);

        self.handle_admin(&message, date);
        self.broadcast(Call::Message(message), Some(date));
    }

    /// Asks every renderable plugin to write its pages.
    pub fn render_all(&mut self, date: DateTime<Local>) {
        self.broadcast(Call::Render, Some(date));
        self.render_home(date);
    }

    /// Runs every task queued so far, without the background loop.
    ///
    /// Tasks queued while the batch runs wait for the next call.
    pub fn drain_tasks(&mut self) -> usize {
        let batch = self.queue.take();
        let count = batch.len();
        for queued in batch {
            self.dispatch(&queued.plugin, Call::Task(queued.task), None);
        }
        count
    }
}

impl std::fmt::Debug for Fairylab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fairylab")
            .field("registry", &self.registry)
            .field("queued", &self.queue.len())
            .field("last_tick", &self.last_tick)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}
