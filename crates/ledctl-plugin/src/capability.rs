//! Plugin capability descriptors.
//!
//! Replaces runtime attribute probing with an
//! explicit descriptor computed once at registration time. `PluginCapabilities`
//! is that descriptor: the registry asks a plugin to report its own flags
//! at load time, and the arbiter / run loop consult the stored flags instead
//! of re-probing the plugin object on every iteration.

use bitflags::bitflags;

bitflags! {
    /// Feature flags a plugin reports about itself at registration time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PluginCapabilities: u32 {
        /// Plugin may claim live priority.
        const LIVE_PRIORITY      = 0b0000_0001;
        /// Slice duration may be extended to a cycle boundary.
        const DYNAMIC_DURATION   = 0b0000_0010;
        /// Plugin tracks cycle completion (`reset_cycle_state`/`is_cycle_complete`).
        const CYCLE_PROTOCOL     = 0b0000_0100;
        /// Plugin wants the high-FPS (~125 FPS) inner render loop.
        const SCROLLING          = 0b0000_1000;
        /// Plugin participates in the ticker compositor.
        const TICKER             = 0b0001_0000;
        /// Plugin receives `on_config_change` hot-reload notifications.
        const CONFIG_RELOAD      = 0b0010_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose() {
        let caps = PluginCapabilities::LIVE_PRIORITY | PluginCapabilities::DYNAMIC_DURATION;
        assert!(caps.contains(PluginCapabilities::LIVE_PRIORITY));
        assert!(caps.contains(PluginCapabilities::DYNAMIC_DURATION));
        assert!(!caps.contains(PluginCapabilities::SCROLLING));
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(PluginCapabilities::default(), PluginCapabilities::empty());
    }
}
