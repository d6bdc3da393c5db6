//! The kernel's table of live plugin instances.
//!
//! Entries keep install order, and replacing a plugin keeps its slot, so
//! dispatch order is stable across reloads.

use chrono::{DateTime, Local};
use fairylab_core::{BoxedPlugin, ErasedPlugin, Plugin};
use serde::Serialize;

// =============================================================================
// RegistryEntry
// =============================================================================

/// One registered plugin.
pub struct RegistryEntry {
    name: String,
    pub(crate) plugin: BoxedPlugin,
    /// Last observable update, or the time of the failure that disabled it.
    pub date: DateTime<Local>,
    /// `false` once a hook failed; the plugin is skipped until reloaded.
    pub ok: bool,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin(&self) -> &dyn ErasedPlugin {
        self.plugin.as_ref()
    }

    pub fn status(&self) -> PluginStatus {
        PluginStatus {
            name: self.name.clone(),
            class: self.plugin.class_name(),
            ok: self.ok,
            date: self.date,
        }
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("class", &self.plugin.class_name())
            .field("date", &self.date)
            .field("ok", &self.ok)
            .finish()
    }
}

/// Serializable snapshot of a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub class: &'static str,
    pub ok: bool,
    pub date: DateTime<Local>,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// Stores `plugin` as a fresh, healthy entry.
    ///
    /// An existing entry with the same name is replaced in place and its old
    /// instance returned.
    pub fn insert(
        &mut self,
        name: &str,
        plugin: BoxedPlugin,
        date: DateTime<Local>,
    ) -> Option<BoxedPlugin> {
        let entry = RegistryEntry {
            name: name.to_owned(),
            plugin,
            date,
            ok: true,
        };
        match self.get_mut(name) {
            Some(slot) => Some(std::mem::replace(slot, entry).plugin),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<RegistryEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> Vec<PluginStatus> {
        self.entries.iter().map(RegistryEntry::status).collect()
    }

    /// Borrows the concrete plugin registered under `name`.
    pub fn downcast_ref<P: Plugin>(&self, name: &str) -> Option<&P> {
        self.get(name)?.plugin.downcast_ref::<P>()
    }

    pub fn downcast_mut<P: Plugin>(&mut self, name: &str) -> Option<&mut P> {
        self.get_mut(name)?.plugin.downcast_mut::<P>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairylab_core::Installed;

    struct Alpha(u8);

    impl Plugin for Alpha {
        const NAME: &'static str = "Alpha";
    }

    struct Beta;

    impl Plugin for Beta {
        const NAME: &'static str = "Beta";
    }

    fn boxed_alpha(n: u8) -> BoxedPlugin {
        Installed::boxed(Alpha(n)).unwrap()
    }

    #[test]
    fn test_insert_keeps_order_and_replaces_in_place() {
        let now = Local::now();
        let mut registry = Registry::new();
        assert!(registry.insert("alpha", boxed_alpha(1), now).is_none());
        assert!(registry.insert("beta", Installed::boxed(Beta).unwrap(), now).is_none());

        registry.get_mut("alpha").unwrap().ok = false;
        let old = registry.insert("alpha", boxed_alpha(2), now).unwrap();

        assert_eq!(old.downcast_ref::<Alpha>().unwrap().0, 1);
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert!(registry.get("alpha").unwrap().ok);
        assert_eq!(registry.downcast_ref::<Alpha>("alpha").unwrap().0, 2);
        assert!(registry.downcast_ref::<Beta>("alpha").is_none());
    }

    #[test]
    fn test_remove() {
        let mut registry = Registry::new();
        registry.insert("alpha", boxed_alpha(1), Local::now());
        assert!(registry.remove("alpha").is_some());
        assert!(registry.remove("alpha").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_status_snapshot() {
        let now = Local::now();
        let mut registry = Registry::new();
        registry.insert("beta", Installed::boxed(Beta).unwrap(), now);
        let status = registry.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].class, "Beta");
        assert!(status[0].ok);
        assert_eq!(status[0].date, now);
    }
}
