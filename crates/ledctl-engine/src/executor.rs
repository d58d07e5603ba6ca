//! Plugin Executor.
//!
//! Wraps every plugin call with a health-tracker consult, a timeout, and
//! failure accounting, so a misbehaving plugin can never panic the run loop
//! or go unnoticed if it runs long. `display`/`update` are synchronous trait
//! methods called directly on this thread (a plugin's `&mut dyn Plugin` is
//! borrowed for the duration of the call and cannot be handed to another
//! thread without `'static` ownership), so the timeout here is detection,
//! not preemption: the call always runs to completion or panics, and a call
//! that overran its budget is recorded as a failure and reported as one to
//! the caller, same as an explicit `DisplayOutcome::Failed`. A plugin that
//! blocks far beyond its budget will delay the run loop for that one slice;
//! the circuit breaker is what keeps a repeat offender from doing that on
//! every visit.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use ledctl_plugin::{DisplayOutcome, ModeName, Plugin};
use ledctl_watchdog::Watchdog;
use tracing::warn;

/// Default timeout for a `display()` call.
pub const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for an `update()` call.
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes plugin calls under the circuit breaker and a timeout.
pub struct PluginExecutor<'a> {
    watchdog: &'a Watchdog,
    display_timeout: Duration,
    update_timeout: Duration,
}

impl<'a> PluginExecutor<'a> {
    /// Build an executor backed by `watchdog`, using the default timeouts.
    #[must_use]
    pub fn new(watchdog: &'a Watchdog) -> Self {
        Self { watchdog, display_timeout: DEFAULT_DISPLAY_TIMEOUT, update_timeout: DEFAULT_UPDATE_TIMEOUT }
    }

    /// Override the default timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, display: Duration, update: Duration) -> Self {
        self.display_timeout = display;
        self.update_timeout = update;
        self
    }

    /// Call `plugin.display(mode, force_clear)` under the circuit breaker
    /// and timeout, recording the outcome on the watchdog.
    ///
    /// Returns `DisplayOutcome::Failed` without invoking the plugin at all
    /// if the circuit is currently open: the call is silently skipped and
    /// logged at debug level.
    pub fn execute_display(
        &self,
        plugin_id: &str,
        plugin: &mut dyn Plugin,
        mode: &ModeName,
        force_clear: bool,
    ) -> DisplayOutcome {
        if self.watchdog.should_skip(plugin_id) {
            tracing::debug!(plugin_id, "skipping plugin call, circuit is open");
            return DisplayOutcome::Failed("circuit-open".to_string());
        }

        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| plugin.display(mode, force_clear)));
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_panic) => DisplayOutcome::Failed("panicked".to_string()),
        };

        if elapsed > self.display_timeout {
            warn!(plugin_id, elapsed_us = elapsed.as_micros(), "plugin display() exceeded its timeout");
            self.watchdog.record_failure(plugin_id, format!("display exceeded timeout ({elapsed:?})"));
            return DisplayOutcome::Failed(format!("timed out after {elapsed:?}"));
        }

        match &outcome {
            DisplayOutcome::Failed(err) => self.watchdog.record_failure(plugin_id, err.clone()),
            _ => self.watchdog.record_success(plugin_id),
        }

        outcome
    }

    /// Call `plugin.update()` under the circuit breaker and timeout.
    /// `update()` failures only affect health accounting, never rendering.
    pub fn execute_update(&self, plugin_id: &str, plugin: &mut dyn Plugin) {
        if self.watchdog.should_skip(plugin_id) {
            return;
        }

        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| plugin.update()));
        let elapsed = start.elapsed();

        if let Err(_panic) = result {
            warn!(plugin_id, "plugin update() panicked");
            self.watchdog.record_failure(plugin_id, "update panicked");
            return;
        }

        if elapsed > self.update_timeout {
            warn!(plugin_id, elapsed_us = elapsed.as_micros(), "plugin update() exceeded its timeout");
            self.watchdog.record_failure(plugin_id, format!("update exceeded timeout ({elapsed:?})"));
            return;
        }

        self.watchdog.record_success(plugin_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledctl_plugin::PluginCapabilities;

    struct SlowPlugin;
    impl Plugin for SlowPlugin {
        fn id(&self) -> &str {
            "slow"
        }
        fn capabilities(&self) -> PluginCapabilities {
            PluginCapabilities::empty()
        }
        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            std::thread::sleep(Duration::from_millis(50));
            DisplayOutcome::Rendered
        }
    }

    struct CrashPlugin;
    impl Plugin for CrashPlugin {
        fn id(&self) -> &str {
            "crash"
        }
        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            panic!("boom");
        }
    }

    #[test]
    fn timeout_records_failure() {
        let watchdog = Watchdog::default();
        let executor = PluginExecutor::new(&watchdog).with_timeouts(Duration::from_millis(5), Duration::from_secs(1));
        let mut plugin = SlowPlugin;
        let outcome = executor.execute_display("slow", &mut plugin, &ModeName::new("slow"), false);
        assert!(matches!(outcome, DisplayOutcome::Failed(_)));
    }

    #[test]
    fn panic_is_caught_and_recorded_as_failure() {
        let watchdog = Watchdog::default();
        let executor = PluginExecutor::new(&watchdog);
        let mut plugin = CrashPlugin;
        let outcome = executor.execute_display("crash", &mut plugin, &ModeName::new("crash"), false);
        assert!(matches!(outcome, DisplayOutcome::Failed(_)));
        assert!(watchdog.summary("crash").expect("recorded").failures >= 1);
    }

    #[test]
    fn circuit_open_skips_without_calling_plugin() {
        let watchdog = Watchdog::default();
        for _ in 0..5 {
            watchdog.record_failure("flaky", "boom");
        }
        assert!(watchdog.should_skip("flaky"));
        let executor = PluginExecutor::new(&watchdog);
        let mut plugin = CrashPlugin;
        // id differs from "flaky" on purpose: execute_display must consult
        // the watchdog by the id passed in, not the plugin's own id.
        let outcome = executor.execute_display("flaky", &mut plugin, &ModeName::new("x"), false);
        assert_eq!(outcome, DisplayOutcome::Failed("circuit-open".to_string()));
    }
}
