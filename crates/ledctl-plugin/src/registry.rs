//! The plugin registry: the loaded-plugin catalog.
//!
//! Discovery in this crate means accepting already-constructed
//! `Box<dyn Plugin>` trait objects (instantiating concrete plugin types is
//! out of scope) paired with a manifest. The registry's job
//! is to validate and index them: compute `available_modes` in discovery
//! order, track the enabled-set, and own the capability descriptors.

use std::collections::HashMap;

use ledctl_errors::{LedCtlError, Result};
use tracing::{info, warn};

use crate::capability::PluginCapabilities;
use crate::manifest::PluginManifest;
use crate::mode::ModeName;
use crate::plugin::Plugin;

/// One loaded plugin and its associated bookkeeping.
pub struct PluginEntry {
    /// Manifest metadata for this plugin.
    pub manifest: PluginManifest,
    /// The live plugin instance.
    pub instance: Box<dyn Plugin>,
    /// Capability descriptor recorded at registration time.
    pub capabilities: PluginCapabilities,
}

/// Catalog of loaded plugins plus the flattened, ordered mode list the
/// arbiter and run loop operate on.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    mode_owner: HashMap<ModeName, usize>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin instance with its manifest.
    ///
    /// If the manifest declares no capabilities, the instance's own
    /// `capabilities()` is used instead, so a plugin author who didn't
    /// write a manifest entry still gets correct arbitration behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if any mode this plugin offers is already owned by
    /// a previously registered plugin (every `ModeName` must be owned by
    /// exactly one loaded, enabled plugin).
    pub fn register(&mut self, manifest: PluginManifest, instance: Box<dyn Plugin>) -> Result<()> {
        let capabilities = if manifest.capabilities.is_empty() {
            instance.capabilities()
        } else {
            manifest.capabilities
        };

        if manifest.enabled {
            for mode in instance.modes() {
                if self.mode_owner.contains_key(&mode) {
                    return Err(LedCtlError::PluginRegistration(format!(
                        "mode '{mode}' already owned by another plugin"
                    )));
                }
            }
        }

        let index = self.entries.len();
        if manifest.enabled {
            for mode in instance.modes() {
                self.mode_owner.insert(mode, index);
            }
        }

        info!(plugin_id = %manifest.id, enabled = manifest.enabled, "registered plugin");
        self.entries.push(PluginEntry { manifest, instance, capabilities });
        Ok(())
    }

    /// The flattened, ordered list of modes available for rotation:
    /// `concat(plugin.modes() for plugin in loaded if enabled)`, preserving
    /// discovery order for deterministic rotation.
    #[must_use]
    pub fn available_modes(&self) -> Vec<ModeName> {
        self.entries
            .iter()
            .filter(|e| e.manifest.enabled)
            .flat_map(|e| e.instance.modes())
            .collect()
    }

    /// Find which plugin owns a mode, if it is currently owned.
    #[must_use]
    pub fn owner_of(&self, mode: &ModeName) -> Option<&PluginEntry> {
        self.mode_owner.get(mode).and_then(|&i| self.entries.get(i))
    }

    /// Mutable access to the plugin owning a mode.
    pub fn owner_of_mut(&mut self, mode: &ModeName) -> Option<&mut PluginEntry> {
        let idx = *self.mode_owner.get(mode)?;
        self.entries.get_mut(idx)
    }

    /// Iterate all registered entries (enabled or not).
    pub fn entries(&self) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter()
    }

    /// Iterate all registered entries mutably.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut PluginEntry> {
        self.entries.iter_mut()
    }

    /// Look up an entry by plugin id.
    #[must_use]
    pub fn by_id(&self, plugin_id: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|e| e.manifest.id == plugin_id)
    }

    /// Look up an entry by plugin id, mutably.
    pub fn by_id_mut(&mut self, plugin_id: &str) -> Option<&mut PluginEntry> {
        self.entries.iter_mut().find(|e| e.manifest.id == plugin_id)
    }

    /// Temporarily enable a disabled plugin (used by on-demand activation).
    /// Fires `on_enable()` since the hook is documented idempotent.
    pub fn temporarily_enable(&mut self, plugin_id: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.manifest.id == plugin_id) else {
            warn!(plugin_id, "cannot enable unknown plugin");
            return false;
        };
        let Some(entry) = self.entries.get_mut(index) else { return false };
        if !entry.manifest.enabled {
            entry.manifest.enabled = true;
            entry.instance.on_enable();
            let modes = entry.instance.modes();
            for mode in modes {
                self.mode_owner.insert(mode, index);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::DisplayOutcome;

    struct StubPlugin {
        id: &'static str,
        modes: Vec<ModeName>,
    }

    impl Plugin for StubPlugin {
        fn id(&self) -> &str {
            self.id
        }

        fn modes(&self) -> Vec<ModeName> {
            self.modes.clone()
        }

        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            DisplayOutcome::Rendered
        }
    }

    fn stub(id: &'static str, modes: &[&str]) -> Box<dyn Plugin> {
        Box::new(StubPlugin { id, modes: modes.iter().map(|m| ModeName::new(*m)).collect() })
    }

    #[test]
    fn available_modes_preserve_discovery_order() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginManifest::new("clock", "Clock"), stub("clock", &["clock"])).expect("register clock");
        registry
            .register(PluginManifest::new("weather", "Weather"), stub("weather", &["weather_current"]))
            .expect("register weather");

        let modes: Vec<String> = registry.available_modes().iter().map(ToString::to_string).collect();
        assert_eq!(modes, vec!["clock".to_string(), "weather_current".to_string()]);
    }

    #[test]
    fn disabled_plugin_modes_excluded() {
        let mut registry = PluginRegistry::new();
        let mut manifest = PluginManifest::new("weather", "Weather");
        manifest.enabled = false;
        registry.register(manifest, stub("weather", &["weather_current"])).expect("register weather");
        assert!(registry.available_modes().is_empty());
    }

    #[test]
    fn duplicate_mode_registration_fails() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginManifest::new("a", "A"), stub("a", &["shared"])).expect("register a");
        let err = registry.register(PluginManifest::new("b", "B"), stub("b", &["shared"]));
        assert!(err.is_err());
    }

    #[test]
    fn temporarily_enable_fires_on_enable_and_adds_modes() {
        let mut registry = PluginRegistry::new();
        let mut manifest = PluginManifest::new("weather", "Weather");
        manifest.enabled = false;
        registry.register(manifest, stub("weather", &["weather_current"])).expect("register weather");
        assert!(registry.available_modes().is_empty());

        assert!(registry.temporarily_enable("weather"));
        assert_eq!(registry.available_modes().len(), 1);
    }
}
