//! Plugin descriptors and discovery.
//!
//! Plugins are compiled in, so "importing a module" becomes looking up a
//! [`PluginDescriptor`] by `(path, name)` and calling its factory. A
//! descriptor is bound to a concrete plugin type, and the install step checks
//! that the type's class name is `capitalize(name)`, mirroring the
//! directory-to-class naming convention used for discovery.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use fairylab_core::{BoxedPlugin, Environment, Installed, Plugin, PluginResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

// ─── InstallContext ──────────────────────────────────────────────────────────

/// Context handed to a plugin factory.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub date: DateTime<Local>,
    pub env: Arc<Environment>,
    /// The plugin's `[plugins.<name>]` config table, or an empty object.
    config: Value,
}

impl InstallContext {
    pub fn new(date: DateTime<Local>, env: Arc<Environment>, config: Value) -> Self {
        Self { date, env, config }
    }

    /// Deserialise the plugin config section into `T`.
    ///
    /// Use `#[serde(default)]` on the struct to make every field optional.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(&self.config)
    }

    pub fn raw_config(&self) -> &Value {
        &self.config
    }
}

// ─── PluginDescriptor ────────────────────────────────────────────────────────

type Factory = dyn Fn(&InstallContext) -> PluginResult<BoxedPlugin> + Send + Sync;

/// Identifies and instantiates one plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Package segment the plugin lives under, e.g. `"plugin"`.
    pub path: &'static str,
    /// Registry name, e.g. `"scoreboard"`.
    pub name: &'static str,
    /// Class name of the plugin type the factory builds.
    pub class: &'static str,
    create: Arc<Factory>,
}

impl PluginDescriptor {
    /// Describes plugin type `P`, built by `factory`.
    pub fn new<P, F>(path: &'static str, name: &'static str, factory: F) -> Self
    where
        P: Plugin,
        F: Fn(&InstallContext) -> PluginResult<P> + Send + Sync + 'static,
    {
        Self {
            path,
            name,
            class: P::NAME,
            create: Arc::new(move |ctx: &InstallContext| Installed::boxed(factory(ctx)?)),
        }
    }

    /// Calls the factory.
    pub fn instantiate(&self, ctx: &InstallContext) -> PluginResult<BoxedPlugin> {
        (self.create)(ctx)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

// ─── PluginCatalog ───────────────────────────────────────────────────────────

/// Every plugin compiled into the binary, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    descriptors: Vec<PluginDescriptor>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, descriptor: PluginDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Adds a descriptor, replacing one with the same path and name.
    pub fn register(&mut self, descriptor: PluginDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|d| d.path == descriptor.path && d.name == descriptor.name)
        {
            Some(slot) => *slot = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    pub fn find(&self, path: &str, name: &str) -> Option<&PluginDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.path == path && d.name == name)
    }

    /// Looks a descriptor up by name alone.
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Lists the descriptors to install at startup.
    ///
    /// Without a plugin directory every descriptor is returned. With one,
    /// only descriptors that have a `<dir>/<name>` sub-directory are kept, so
    /// deleting a plugin's directory disables it.
    pub fn discover(&self, plugin_dir: Option<&Path>) -> Vec<&PluginDescriptor> {
        let Some(dir) = plugin_dir else {
            return self.descriptors.iter().collect();
        };

        let present: BTreeSet<String> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|n| !n.starts_with(['_', '.']))
                .collect(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot list plugin directory");
                return Vec::new();
            }
        };

        for name in &present {
            if self.get(name).is_none() {
                debug!(plugin = %name, "Plugin directory has no compiled plugin");
            }
        }

        self.descriptors
            .iter()
            .filter(|d| present.contains(d.name))
            .collect()
    }
}

/// Upper-cases the first character and lower-cases the rest.
///
/// `"recap"` → `"Recap"`, `"leagueFile"` → `"Leaguefile"`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
