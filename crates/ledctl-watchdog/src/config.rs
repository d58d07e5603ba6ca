//! Configuration for the watchdog / circuit breaker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the per-plugin circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Length of the first circuit-open period.
    pub base_backoff: Duration,
    /// Upper bound the backoff is clamped to, no matter how many trips occur.
    pub max_backoff: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            base_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(30 * 60),
        }
    }
}

impl WatchdogConfig {
    /// Validate that the configuration is usable; all-zero durations or a
    /// zero threshold would make the breaker meaningless.
    ///
    /// # Errors
    ///
    /// Returns an error message describing the first invalid field found.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be at least 1".to_string());
        }
        if self.base_backoff.is_zero() {
            return Err("base_backoff must be positive".to_string());
        }
        if self.max_backoff < self.base_backoff {
            return Err("max_backoff must be >= base_backoff".to_string());
        }
        Ok(())
    }
}
