//! Built-in plugins compiled into the daemon binary.
//!
//! The registry only ever accepts already-constructed `Box<dyn Plugin>`
//! instances; instantiating concrete plugin types from a manifest id is
//! this module's job, not the registry's.

mod clock;

use ledctl_plugin::Plugin;

pub use clock::ClockPlugin;

/// Construct the built-in plugin instance for a manifest id, if one exists.
#[must_use]
pub fn construct(plugin_id: &str) -> Option<Box<dyn Plugin>> {
    match plugin_id {
        "clock" => Some(Box::new(ClockPlugin)),
        _ => None,
    }
}
