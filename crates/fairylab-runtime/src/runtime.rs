//! Process orchestration: the tick loop, the background task loop and the
//! Slack socket loop, all converging on one kernel behind a coarse lock.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fairylab_runtime::{FairylabRuntime, RunOutcome};
//!
//! let runtime = FairylabRuntime::builder(catalog)
//!     .config_file("fairylab.toml")
//!     .build()?;
//!
//! if runtime.run().await? == RunOutcome::Reboot {
//!     return Err(fairylab_runtime::restart_process().into());
//! }
//! ```
//!
//! # Locking
//!
//! Every tick pass and every message pass holds the kernel lock for its
//! whole duration, on a `spawn_blocking` thread. The background loop swaps
//! the queue out without the lock, then takes the lock once per task.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use fairylab_core::{ChatClient, Environment, NullChatClient, RenderMode, Renderer};
use fairylab_framework::{Fairylab, KernelSignal, PluginCatalog, PluginStatus, TaskQueue, queue};
use fairylab_transport::{SlackWebClient, SocketClient, SocketHandler};
use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, FairylabConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// How [`FairylabRuntime::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Ctrl+C, SIGTERM, the `Fairylab.shutdown()` admin command, or the Slack
    /// socket giving up after its retry budget.
    Shutdown,
    /// The `Fairylab.reboot()` admin command; the caller should restart the
    /// process, e.g. with [`restart_process`].
    Reboot,
}

/// The running bot.
#[derive(Clone)]
pub struct FairylabRuntime {
    config: FairylabConfig,
    kernel: Arc<Mutex<Fairylab>>,
    queue: TaskQueue,
    web: Option<Arc<SlackWebClient>>,
    cancel: CancellationToken,
}

impl FairylabRuntime {
    pub fn builder(catalog: PluginCatalog) -> RuntimeBuilder {
        RuntimeBuilder::new(catalog)
    }

    /// Builds the runtime from loaded configuration.
    ///
    /// Must be called from within a tokio runtime when Slack is enabled,
    /// since the Web API client binds to the current runtime handle.
    pub fn from_config(config: FairylabConfig, catalog: PluginCatalog) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging)?;

        let renderer = match &config.render.templates {
            Some(dir) => Renderer::from_dir(dir)?,
            None => Renderer::empty(),
        };

        let web = if config.slack.is_live() {
            Some(Arc::new(SlackWebClient::new(
                config.slack.token.clone(),
                config.slack.api_url.clone(),
            )?))
        } else {
            info!("Slack disabled, running headless");
            None
        };
        let chat: Arc<dyn ChatClient> = match &web {
            Some(web) => web.clone(),
            None => Arc::new(NullChatClient),
        };

        let env = Environment::new(renderer)
            .with_html_root(&config.render.html_root)
            .with_golden_root(&config.render.golden_root)
            .with_mode(config.render.mode)
            .with_testing_channel(config.slack.testing_channel.clone())
            .with_docs_url(config.render.docs_url.clone())
            .with_home_url(config.render.home_url.clone())
            .with_chat(chat);

        let queue = TaskQueue::new();
        let mut kernel = Fairylab::new(catalog, Arc::new(env))
            .with_plugin_configs(config.plugins.clone())
            .with_queue(queue.clone());
        if let Some(dir) = &config.kernel.plugin_dir {
            kernel = kernel.with_plugin_dir(dir);
        }

        info!(
            log_level = %config.logging.level,
            tick_interval_secs = config.kernel.tick_interval_secs,
            task_interval_secs = config.kernel.task_interval_secs,
            mode = ?config.render.mode,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            kernel: Arc::new(Mutex::new(kernel)),
            queue,
            web,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &FairylabConfig {
        &self.config
    }

    /// The kernel behind the coarse lock.
    pub fn kernel(&self) -> &Arc<Mutex<Fairylab>> {
        &self.kernel
    }

    /// Token that stops every loop started by [`run`](Self::run).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // =========================================================================
    // Kernel passes
    // =========================================================================

    /// Runs `f` against the locked kernel on a blocking thread.
    async fn with_kernel<F, T>(&self, f: F) -> RuntimeResult<T>
    where
        F: FnOnce(&mut Fairylab) -> T + Send + 'static,
        T: Send + 'static,
    {
        let kernel = Arc::clone(&self.kernel);
        Ok(tokio::task::spawn_blocking(move || f(&mut kernel.lock())).await?)
    }

    /// Installs and sets up every plugin.
    pub async fn setup(&self) -> RuntimeResult<()> {
        self.with_kernel(|kernel| kernel.setup(Local::now())).await
    }

    pub async fn tick(&self) -> RuntimeResult<()> {
        self.with_kernel(|kernel| kernel.tick(Local::now())).await
    }

    /// Feeds one raw socket frame to the kernel. Returns the admin signal the
    /// frame raised, if any.
    pub async fn on_message(&self, raw: String) -> RuntimeResult<Option<KernelSignal>> {
        self.with_kernel(move |kernel| {
            kernel.on_message_received(&raw, None);
            kernel.take_signal()
        })
        .await
    }

    /// One background cycle. Returns the number of tasks run.
    pub async fn drain(&self) -> RuntimeResult<usize> {
        let kernel = Arc::clone(&self.kernel);
        let queue = self.queue.clone();
        Ok(tokio::task::spawn_blocking(move || queue::drain(&kernel, &queue)).await?)
    }

    pub async fn status(&self) -> RuntimeResult<Vec<PluginStatus>> {
        self.with_kernel(|kernel| kernel.status()).await
    }

    /// Setup, one tick, one background cycle. No socket.
    pub async fn run_once(&self) -> RuntimeResult<()> {
        self.setup().await?;
        self.tick().await?;
        let count = self.drain().await?;
        info!(tasks = count, "Single pass complete");
        Ok(())
    }

    // =========================================================================
    // Loops
    // =========================================================================

    /// Sets up the kernel, then runs every loop until shutdown or reboot is
    /// requested.
    pub async fn run(&self) -> RuntimeResult<RunOutcome> {
        self.setup().await?;

        let (signal_tx, mut signal_rx) = mpsc::channel::<KernelSignal>(4);
        let mut handles: Vec<JoinHandle<()>> = vec![
            tokio::spawn(self.clone().tick_loop()),
            tokio::spawn(self.clone().background_loop()),
        ];
        if self.web.is_some() {
            handles.push(tokio::spawn(self.clone().socket_loop(signal_tx)));
        } else {
            drop(signal_tx);
        }

        info!("Fairylab is now running. Press Ctrl+C to stop.");

        let outcome = tokio::select! {
            Some(signal) = signal_rx.recv() => match signal {
                KernelSignal::Reboot => RunOutcome::Reboot,
                KernelSignal::Shutdown => RunOutcome::Shutdown,
            },
            _ = wait_for_shutdown() => RunOutcome::Shutdown,
            _ = self.cancel.cancelled() => RunOutcome::Shutdown,
        };

        self.cancel.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Loop ended abnormally");
            }
        }

        info!(outcome = ?outcome, "Runtime stopped");
        Ok(outcome)
    }

    async fn tick_loop(self) {
        let mut interval = tokio::time::interval(self.config.kernel.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Tick failed");
                    }
                }
            }
        }
        debug!("Tick loop stopped");
    }

    async fn background_loop(self) {
        let period = self.config.kernel.task_interval();
        loop {
            if let Err(e) = self.drain().await {
                error!(error = %e, "Background cycle failed");
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(period) => {}
            }
        }
        debug!("Background loop stopped");
    }

    async fn socket_loop(self, signals: mpsc::Sender<KernelSignal>) {
        let Some(web) = self.web.clone() else {
            return;
        };
        let client = SocketClient::new(web, self.config.slack.retry.clone());
        let cancel = self.cancel.child_token();
        let shutdown = self.cancel.clone();
        let handler = Arc::new(KernelHandler {
            runtime: self,
            signals,
        });

        // No socket means no commands and no admin signals.
        if let Err(e) = client.run(handler, cancel).await {
            error!(error = %e, "Socket client stopped, shutting down");
            shutdown.cancel();
        }
    }
}

impl std::fmt::Debug for FairylabRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FairylabRuntime")
            .field("live", &self.web.is_some())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// Bridges socket frames into the kernel.
struct KernelHandler {
    runtime: FairylabRuntime,
    signals: mpsc::Sender<KernelSignal>,
}

#[async_trait]
impl SocketHandler for KernelHandler {
    async fn on_text(&self, text: String) {
        match self.runtime.on_message(text).await {
            Ok(Some(signal)) => {
                info!(signal = ?signal, "Admin signal received");
                let _ = self.signals.send(signal).await;
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "Message pass failed"),
        }
    }

    async fn on_disconnect(&self) {
        warn!("Slack socket closed");
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }
}

/// Replaces the current process with a fresh copy of itself, same arguments.
///
/// Only returns on failure.
pub fn restart_process() -> RuntimeError {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return e.into(),
    };
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    info!(exe = %exe.display(), "Restarting process");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        Command::new(exe).args(args).exec().into()
    }

    #[cfg(not(unix))]
    {
        match Command::new(exe).args(args).spawn() {
            Ok(_) => std::process::exit(0),
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration and builds a [`FairylabRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    catalog: PluginCatalog,
    render_mode: Option<RenderMode>,
}

impl RuntimeBuilder {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalog,
            render_mode: None,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides `render.mode` after loading.
    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = Some(mode);
        self
    }

    pub fn build(self) -> RuntimeResult<FairylabRuntime> {
        let mut config = self.config_loader.load()?;
        if let Some(mode) = self.render_mode {
            config.render.mode = mode;
        }
        FairylabRuntime::from_config(config, self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairylab_core::prelude::*;
    use fairylab_framework::PluginDescriptor;

    #[derive(Default)]
    struct Counter {
        runs: u32,
        bumps: u32,
    }

    impl Counter {
        fn bump(&mut self, _: &HookContext<'_>, _: &Invocation) -> PluginResult<Response> {
            self.bumps += 1;
            Ok(Response::new())
        }
    }

    impl Plugin for Counter {
        const NAME: &'static str = "Counter";

        fn commands() -> CommandTable<Self> {
            CommandTable::new().internal("bump", Self::bump)
        }

        fn as_runnable(&mut self) -> Option<&mut dyn Runnable> {
            Some(self)
        }
    }

    impl Runnable for Counter {
        fn run_internal(&mut self, _: &HookContext<'_>) -> PluginResult<Response> {
            self.runs += 1;
            Ok(Response::new().with_task([Task::new("bump")]))
        }
    }

    fn runtime(root: &Path) -> FairylabRuntime {
        let mut config = FairylabConfig::default();
        config.render.html_root = root.join("html");
        config.render.golden_root = root.join("golden");
        let catalog = PluginCatalog::new()
            .with(PluginDescriptor::new("plugin", "counter", |_| Ok(Counter::default())));
        FairylabRuntime::from_config(config, catalog).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_once() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(dir.path());

        runtime.run_once().await.unwrap();

        let kernel = runtime.kernel().lock();
        let counter = kernel.registry().downcast_ref::<Counter>("counter").unwrap();
        assert_eq!(counter.runs, 1);
        assert_eq!(counter.bumps, 1);
        assert!(dir.path().join("html/index.html").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_task_waits_for_drain() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(dir.path());

        runtime.setup().await.unwrap();
        runtime.tick().await.unwrap();
        runtime.tick().await.unwrap();
        assert_eq!(runtime.queue.len(), 2);

        assert_eq!(runtime.drain().await.unwrap(), 2);
        assert_eq!(runtime.drain().await.unwrap(), 0);
        let status = runtime.status().await.unwrap();
        assert_eq!(status.len(), 1);
        assert!(status[0].ok);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_admin_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(dir.path());
        runtime.setup().await.unwrap();

        let frame = r#"{"type":"message","channel":"testing","text":"Fairylab.shutdown()"}"#;
        let signal = runtime.on_message(frame.to_string()).await.unwrap();
        assert_eq!(signal, Some(KernelSignal::Shutdown));

        let frame = r#"{"type":"message","channel":"general","text":"Fairylab.shutdown()"}"#;
        assert_eq!(runtime.on_message(frame.to_string()).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = runtime(dir.path());
        let cancel = runtime.cancellation_token();

        let handle = tokio::spawn({
            let runtime = runtime.clone();
            async move { runtime.run().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Shutdown);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = FairylabConfig::default();
        config.kernel.tick_interval_secs = 0;
        let err = FairylabRuntime::from_config(config, PluginCatalog::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}
