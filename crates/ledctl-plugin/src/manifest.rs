//! Plugin manifest: the configuration-facing description of a plugin.

use serde::{Deserialize, Serialize};

use crate::capability::PluginCapabilities;

/// Static metadata about a plugin, independent of its `Plugin` trait object.
///
/// The registry pairs one of these with each loaded `Box<dyn Plugin>`; it is
/// what `enabled` and discovery order are read from, and what the
/// capability descriptor is recorded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Stable plugin identifier, matches `Plugin::id`.
    pub id: String,
    /// Human-readable name for logs and the control plane.
    pub display_name: String,
    /// Whether this plugin participates in discovery / rotation.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Capability flags; if omitted, capabilities are read from the plugin
    /// instance itself at registration time.
    #[serde(default)]
    pub capabilities: PluginCapabilities,
}

const fn default_enabled() -> bool {
    true
}

impl PluginManifest {
    /// Construct a manifest for an enabled plugin with no declared capabilities.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            enabled: true,
            capabilities: PluginCapabilities::empty(),
        }
    }
}
