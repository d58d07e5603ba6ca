//! Health tracking and circuit breaker orchestration.
//!
//! Mirrors the failure-threshold scheme of a simpler "N consecutive
//! failures opens the circuit" health check, generalized with the
//! exponentially-backed-off reopen interval:
//! the first trip opens the circuit for `base_backoff`; each subsequent
//! trip (without an intervening success) doubles the backoff up to
//! `max_backoff`. A single success closes the circuit and resets the
//! backoff back to `base_backoff`.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::WatchdogConfig;
use crate::error::{WatchdogError, WatchdogResult};
use crate::stats::PluginStats;

/// A point-in-time summary of one plugin's health, for status reporting.
#[derive(Debug, Clone)]
pub struct HealthSummary {
    /// The plugin this summary describes.
    pub plugin_id: String,
    /// Total successful calls.
    pub successes: u64,
    /// Total failed calls.
    pub failures: u64,
    /// Most recent failure text, if any.
    pub last_error: Option<String>,
    /// Whether the circuit is presently open.
    pub circuit_open: bool,
}

/// Tracks per-plugin health and enforces the circuit breaker.
pub struct Watchdog {
    config: WatchdogConfig,
    stats: RwLock<HashMap<String, PluginStats>>,
}

impl Watchdog {
    /// Build a watchdog from validated configuration.
    #[must_use]
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config, stats: RwLock::new(HashMap::new()) }
    }

    /// Whether calls to this plugin should currently be skipped.
    #[must_use]
    pub fn should_skip(&self, plugin_id: &str) -> bool {
        self.stats.read().get(plugin_id).is_some_and(PluginStats::is_circuit_open)
    }

    /// Record a successful call; closes the circuit if it was open.
    pub fn record_success(&self, plugin_id: &str) {
        let mut guard = self.stats.write();
        let stats = guard
            .entry(plugin_id.to_string())
            .or_insert_with(|| PluginStats::new(self.config.base_backoff));
        let was_open = stats.is_circuit_open();
        stats.total_successes += 1;
        stats.consecutive_failures = 0;
        stats.last_success_at = Some(Instant::now());
        stats.circuit_open_until = None;
        stats.next_backoff = self.config.base_backoff;
        if was_open {
            info!(plugin_id, "circuit closed after successful call");
        }
    }

    /// Record a failed call; opens the circuit once the threshold is reached.
    pub fn record_failure(&self, plugin_id: &str, error: impl Into<String>) {
        let mut guard = self.stats.write();
        let stats = guard
            .entry(plugin_id.to_string())
            .or_insert_with(|| PluginStats::new(self.config.base_backoff));
        stats.total_failures += 1;
        stats.consecutive_failures = stats.consecutive_failures.saturating_add(1);
        stats.last_error = Some(error.into());

        if stats.consecutive_failures >= self.config.failure_threshold {
            let backoff = stats.next_backoff.min(self.config.max_backoff);
            stats.circuit_open_until = Some(Instant::now() + backoff);
            stats.trip_count = stats.trip_count.saturating_add(1);
            stats.next_backoff = (backoff * 2).min(self.config.max_backoff);
            warn!(
                plugin_id,
                consecutive_failures = stats.consecutive_failures,
                backoff_s = backoff.as_secs(),
                "circuit opened after consecutive failures"
            );
        } else {
            debug!(
                plugin_id,
                consecutive_failures = stats.consecutive_failures,
                "recorded plugin failure"
            );
        }
    }

    /// Explicitly close a plugin's circuit (operator override).
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::NotOpen`] if the circuit is not currently open.
    pub fn release(&self, plugin_id: &str) -> WatchdogResult<()> {
        let mut guard = self.stats.write();
        let stats = guard.get_mut(plugin_id).ok_or_else(|| WatchdogError::plugin_not_found(plugin_id))?;
        if !stats.is_circuit_open() {
            return Err(WatchdogError::not_open(plugin_id));
        }
        stats.circuit_open_until = None;
        stats.consecutive_failures = 0;
        stats.next_backoff = self.config.base_backoff;
        Ok(())
    }

    /// Snapshot a single plugin's health, if known.
    #[must_use]
    pub fn summary(&self, plugin_id: &str) -> Option<HealthSummary> {
        self.stats.read().get(plugin_id).map(|s| HealthSummary {
            plugin_id: plugin_id.to_string(),
            successes: s.total_successes,
            failures: s.total_failures,
            last_error: s.last_error.clone(),
            circuit_open: s.is_circuit_open(),
        })
    }

    /// Snapshot health for every plugin the watchdog has seen.
    #[must_use]
    pub fn all_summaries(&self) -> Vec<HealthSummary> {
        self.stats
            .read()
            .iter()
            .map(|(id, s)| HealthSummary {
                plugin_id: id.clone(),
                successes: s.total_successes,
                failures: s.total_failures,
                last_error: s.last_error.clone(),
                circuit_open: s.is_circuit_open(),
            })
            .collect()
    }

    /// Plugin ids whose circuit is presently open.
    #[must_use]
    pub fn open_circuits(&self) -> Vec<String> {
        self.stats
            .read()
            .iter()
            .filter(|(_, s)| s.is_circuit_open())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(WatchdogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> WatchdogConfig {
        WatchdogConfig {
            failure_threshold: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(400),
        }
    }

    #[test]
    fn circuit_opens_after_threshold() {
        let wd = Watchdog::new(fast_config());
        assert!(!wd.should_skip("plugin_a"));
        wd.record_failure("plugin_a", "boom");
        wd.record_failure("plugin_a", "boom");
        assert!(!wd.should_skip("plugin_a"));
        wd.record_failure("plugin_a", "boom");
        assert!(wd.should_skip("plugin_a"));
    }

    #[test]
    fn success_closes_circuit() {
        let wd = Watchdog::new(fast_config());
        for _ in 0..3 {
            wd.record_failure("plugin_a", "boom");
        }
        assert!(wd.should_skip("plugin_a"));
        wd.record_success("plugin_a");
        assert!(!wd.should_skip("plugin_a"));
    }

    #[test]
    fn backoff_doubles_on_repeated_trips() {
        let wd = Watchdog::new(fast_config());
        for _ in 0..3 {
            wd.record_failure("plugin_a", "boom");
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(!wd.should_skip("plugin_a"));
        for _ in 0..3 {
            wd.record_failure("plugin_a", "boom");
        }
        let summary = wd.summary("plugin_a").expect("recorded");
        assert!(summary.circuit_open);
    }

    #[test]
    fn release_requires_open_circuit() {
        let wd = Watchdog::new(fast_config());
        wd.record_failure("plugin_a", "boom");
        assert!(wd.release("plugin_a").is_err());
    }

    #[test]
    fn unseen_plugin_is_never_skipped() {
        let wd = Watchdog::default();
        assert!(!wd.should_skip("never_seen"));
        assert!(wd.summary("never_seen").is_none());
    }
}
