//! The in-process plugin contract, capability model, and registry.
//!
//! Replaces the attribute-probing ("duck typing") style of feature
//! detection with an explicit `Plugin` trait carrying documented defaults,
//! plus a `PluginCapabilities` descriptor recorded once at registration
//! time.

mod capability;
mod manifest;
mod mode;
mod outcome;
mod plugin;
mod registry;

pub use capability::PluginCapabilities;
pub use manifest::PluginManifest;
pub use mode::ModeName;
pub use outcome::DisplayOutcome;
pub use plugin::{Plugin, DEFAULT_DISPLAY_DURATION, DEFAULT_DYNAMIC_DURATION_CAP};
pub use registry::{PluginEntry, PluginRegistry};
