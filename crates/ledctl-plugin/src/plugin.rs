//! The in-process plugin contract.

use std::time::Duration;

use crate::capability::PluginCapabilities;
use crate::mode::ModeName;
use crate::outcome::DisplayOutcome;

/// Default display duration used when neither the plugin nor config specify one.
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(30);

/// Default cap on dynamic-duration slices.
pub const DEFAULT_DYNAMIC_DURATION_CAP: Duration = Duration::from_secs(180);

/// A content producer that can render one or more named display modes.
///
/// Every method has a default matching the "default if absent" column of
/// the capability table below, so a minimal plugin only needs to
/// implement `id` and `display`. Capability-gated behavior (live priority,
/// dynamic duration, cycle protocol, scrolling) is read once at
/// registration time via [`Plugin::capabilities`] rather than probed on
/// every call.
pub trait Plugin: Send {
    /// Stable identifier for this plugin, distinct from any mode name.
    fn id(&self) -> &str;

    /// The capability flags this plugin reports about itself.
    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::empty()
    }

    /// Display modes this plugin currently offers.
    fn modes(&self) -> Vec<ModeName> {
        vec![ModeName::new(self.id())]
    }

    /// Refresh internal data. Must not block the calling thread for long;
    /// plugins needing network I/O should do it on their own worker threads.
    fn update(&mut self) {}

    /// Draw one frame for `mode`. `force_clear` is true exactly once per
    /// mode switch.
    fn display(&mut self, mode: &ModeName, force_clear: bool) -> DisplayOutcome;

    /// Preferred slice length for `mode`.
    fn get_display_duration(&self, _mode: &ModeName) -> Duration {
        DEFAULT_DISPLAY_DURATION
    }

    /// Upper bound in seconds a dynamic-duration slice may run for.
    fn get_dynamic_duration_cap(&self) -> Duration {
        DEFAULT_DYNAMIC_DURATION_CAP
    }

    /// Plugin-computed total length of one full cycle through `mode`'s content.
    fn get_cycle_duration(&self, _mode: &ModeName) -> Option<Duration> {
        None
    }

    /// Reset cycle-completion bookkeeping when entering a new dynamic slice.
    fn reset_cycle_state(&mut self) {}

    /// Whether the current cycle has completed.
    fn is_cycle_complete(&self) -> bool {
        false
    }

    /// Whether this plugin may claim live priority at all.
    fn has_live_priority(&self) -> bool {
        false
    }

    /// Whether this plugin currently has live content to show.
    fn has_live_content(&self) -> bool {
        false
    }

    /// Modes to try, in order, when live content is present.
    fn get_live_modes(&self) -> Vec<ModeName> {
        Vec::new()
    }

    /// Hot-reload hook; called on the run loop thread between iterations,
    /// never concurrently with `display`.
    fn on_config_change(&mut self, _config: &serde_json::Value) {}

    /// Lifecycle hook fired when the plugin transitions from disabled to enabled.
    fn on_enable(&mut self) {}

    /// Lifecycle hook fired when the plugin transitions from enabled to disabled.
    fn on_disable(&mut self) {}
}
