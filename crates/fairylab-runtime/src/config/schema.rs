//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use fairylab_core::RenderMode;
use fairylab_transport::{RetryConfig, SLACK_API_URL};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FairylabConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub kernel: KernelConfig,

    #[serde(default)]
    pub render: RenderConfig,

    /// Free-form per-plugin tables, keyed by plugin name, handed to the
    /// plugin factory at install time.
    #[serde(default)]
    pub plugins: HashMap<String, Value>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; falls back to `compact` without it.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// The `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include file and line of the call site.
    #[serde(default)]
    pub file_location: bool,

    /// Log every plugin hook call with its duration.
    #[serde(default)]
    pub trace_hooks: bool,

    /// Per-module levels, e.g. `fairylab_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Slack
// =============================================================================

/// The `[slack]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Connect to Slack at all. When off (or without a token) the bot runs
    /// headless: ticks and tasks still run, chat posts are dropped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bot token.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// The only channel admin and plugin commands are accepted from.
    #[serde(default = "default_testing_channel")]
    pub testing_channel: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            api_url: default_api_url(),
            testing_channel: default_testing_channel(),
            retry: RetryConfig::default(),
        }
    }
}

impl SlackConfig {
    /// Whether a live connection should be opened.
    pub fn is_live(&self) -> bool {
        self.enabled && !self.token.is_empty()
    }
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    SLACK_API_URL.to_string()
}

fn default_testing_channel() -> String {
    "testing".to_string()
}

// =============================================================================
// Kernel
// =============================================================================

/// The `[kernel]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Seconds between ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Seconds between background task drains.
    #[serde(default = "default_task_interval")]
    pub task_interval_secs: u64,

    /// Limits discovery to plugins that have a directory here.
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            task_interval_secs: default_task_interval(),
            plugin_dir: None,
        }
    }
}

impl KernelConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn task_interval(&self) -> Duration {
        Duration::from_secs(self.task_interval_secs)
    }
}

fn default_tick_interval() -> u64 {
    120
}

fn default_task_interval() -> u64 {
    10
}

// =============================================================================
// Render
// =============================================================================

/// The `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_html_root")]
    pub html_root: PathBuf,

    #[serde(default = "default_golden_root")]
    pub golden_root: PathBuf,

    /// Directory of `*.html` templates. Without it only the built-in home
    /// page renders.
    #[serde(default)]
    pub templates: Option<PathBuf>,

    #[serde(default)]
    pub docs_url: String,

    /// Public URL of the HTML root, used for page links in chat.
    #[serde(default)]
    pub home_url: String,

    #[serde(default)]
    pub mode: RenderMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            html_root: default_html_root(),
            golden_root: default_golden_root(),
            templates: None,
            docs_url: String::new(),
            home_url: String::new(),
            mode: RenderMode::Live,
        }
    }
}

fn default_html_root() -> PathBuf {
    PathBuf::from("html")
}

fn default_golden_root() -> PathBuf {
    PathBuf::from("golden")
}
