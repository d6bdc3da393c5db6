//! The response vocabulary exchanged between plugin hooks and the kernel.
//!
//! Every hook returns a [`Response`]. The kernel never mutates it; it only
//! reads the four lists to fan out side effects, in this fixed order:
//!
//! 1. `notify` entries other than [`Notify::Base`] are broadcast to every
//!    registered plugin.
//! 2. `shadow` entries are delivered to their destination plugin only.
//! 3. `task` entries are queued for the background loop.
//!
//! `debug` entries are logged by the kernel against the producing plugin.

use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Notify
// =============================================================================

/// A broadcast signal kind.
///
/// `Base` is the generic "something changed" signal: it marks the producing
/// plugin as updated but never fans out. Every other variant is delivered to
/// the `notify` hook of all registered plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notify {
    Base,
    DownloadFinish,
    ExportsEmails,
    FairylabDay,
    LeaguefileFinal,
    StatsplusSim,
    StatsplusSave,
    Other,
}

impl Notify {
    /// Returns `true` for the generic signal that does not fan out.
    pub fn is_base(self) -> bool {
        matches!(self, Notify::Base)
    }

    /// Wire name of the signal.
    pub fn as_str(self) -> &'static str {
        match self {
            Notify::Base => "BASE",
            Notify::DownloadFinish => "DOWNLOAD_FINISH",
            Notify::ExportsEmails => "EXPORTS_EMAILS",
            Notify::FairylabDay => "FAIRYLAB_DAY",
            Notify::LeaguefileFinal => "LEAGUEFILE_FINAL",
            Notify::StatsplusSim => "STATSPLUS_SIM",
            Notify::StatsplusSave => "STATSPLUS_SAVE",
            Notify::Other => "OTHER",
        }
    }
}

impl fmt::Display for Notify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Shadow
// =============================================================================

/// A one-way data handoff into another plugin's private shadow map.
///
/// Delivery is last-write-wins on `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    /// Name of the receiving plugin.
    pub destination: String,
    /// Slot in the receiver's shadow map.
    pub key: String,
    /// Payload stored under `key`.
    #[serde(default)]
    pub data: Value,
}

impl Shadow {
    pub fn new(destination: impl Into<String>, key: impl Into<String>, data: Value) -> Self {
        Self {
            destination: destination.into(),
            key: key.into(),
            data,
        }
    }
}

// =============================================================================
// Task
// =============================================================================

/// A deferred call to a command on the producing plugin.
///
/// # Example
///
/// ```rust
/// use fairylab_core::Task;
///
/// let task = Task::new("download").arg("2026").kwarg("retry", true);
/// assert_eq!(task.target, "download");
/// assert_eq!(task.args.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Command name on the same plugin.
    pub target: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Task {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// DebugEntry
// =============================================================================

/// A log line a plugin wants the kernel to emit on its behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub msg: String,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl DebugEntry {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            extra: Map::new(),
        }
    }

    /// Attaches a structured field to the entry.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Response
// =============================================================================

/// The value every plugin hook returns.
///
/// All lists default to empty, and an explicit JSON `null` for any of them
/// deserialises to an empty list as well. Equality is field-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub debug: Vec<DebugEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notify: Vec<Notify>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shadow: Vec<Shadow>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub task: Vec<Task>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Response {
    /// An empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Response::new().with_notify([Notify::Base])`.
    pub fn base() -> Self {
        Self::new().with_notify([Notify::Base])
    }

    // ─── Builders ────────────────────────────────────────────────────────────

    pub fn with_debug(mut self, debug: impl IntoIterator<Item = DebugEntry>) -> Self {
        self.debug = debug.into_iter().collect();
        self
    }

    pub fn with_notify(mut self, notify: impl IntoIterator<Item = Notify>) -> Self {
        self.notify = notify.into_iter().collect();
        self
    }

    pub fn with_shadow(mut self, shadow: impl IntoIterator<Item = Shadow>) -> Self {
        self.shadow = shadow.into_iter().collect();
        self
    }

    pub fn with_task(mut self, task: impl IntoIterator<Item = Task>) -> Self {
        self.task = task.into_iter().collect();
        self
    }

    // ─── Setters ─────────────────────────────────────────────────────────────
    //
    // `None` clears the list.

    pub fn set_debug(&mut self, debug: Option<Vec<DebugEntry>>) {
        self.debug = debug.unwrap_or_default();
    }

    pub fn set_notify(&mut self, notify: Option<Vec<Notify>>) {
        self.notify = notify.unwrap_or_default();
    }

    pub fn set_shadow(&mut self, shadow: Option<Vec<Shadow>>) {
        self.shadow = shadow.unwrap_or_default();
    }

    pub fn set_task(&mut self, task: Option<Vec<Task>>) {
        self.task = task.unwrap_or_default();
    }

    // ─── Appenders ───────────────────────────────────────────────────────────

    pub fn append_debug(&mut self, entry: DebugEntry) {
        self.debug.push(entry);
    }

    pub fn append_notify(&mut self, notify: Notify) {
        self.notify.push(notify);
    }

    pub fn append_shadow(&mut self, shadow: Shadow) {
        self.shadow.push(shadow);
    }

    pub fn append_task(&mut self, task: Task) {
        self.task.push(task);
    }

    /// Moves every entry of `other` onto the end of `self`.
    pub fn extend(&mut self, other: Response) {
        self.debug.extend(other.debug);
        self.notify.extend(other.notify);
        self.shadow.extend(other.shadow);
        self.task.extend(other.task);
    }

    /// Returns `true` when no list carries an entry.
    pub fn is_empty(&self) -> bool {
        self.debug.is_empty()
            && self.notify.is_empty()
            && self.shadow.is_empty()
            && self.task.is_empty()
    }
}
