//! A minimal built-in plugin, shipped so the daemon has something to
//! rotate through out of the box. Real panel plugins are compiled into the
//! daemon binary the same way; this one just formats the local time.

use chrono::Local;
use ledctl_plugin::{DisplayOutcome, ModeName, Plugin};
use tracing::debug;

/// Displays the current local time. Draws nothing to real hardware since
/// that abstraction is out of scope here; it logs the frame it would send.
#[derive(Debug, Default)]
pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn id(&self) -> &str {
        "clock"
    }

    fn modes(&self) -> Vec<ModeName> {
        vec![ModeName::new("clock")]
    }

    fn display(&mut self, mode: &ModeName, force_clear: bool) -> DisplayOutcome {
        let text = Local::now().format("%H:%M:%S").to_string();
        debug!(mode = %mode, force_clear, frame = %text, "clock frame");
        DisplayOutcome::Rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_renders() {
        let mut plugin = ClockPlugin;
        let outcome = plugin.display(&ModeName::new("clock"), false);
        assert_eq!(outcome, DisplayOutcome::Rendered);
    }

    #[test]
    fn reports_a_single_mode() {
        let plugin = ClockPlugin;
        assert_eq!(plugin.modes(), vec![ModeName::new("clock")]);
    }
}
