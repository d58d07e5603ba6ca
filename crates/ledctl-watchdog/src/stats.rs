//! Per-plugin execution statistics.

use std::time::Instant;

/// Execution statistics and circuit-breaker bookkeeping for one plugin.
#[derive(Debug, Clone)]
pub struct PluginStats {
    /// Total successful calls recorded.
    pub total_successes: u64,
    /// Total failed calls recorded.
    pub total_failures: u64,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
    /// Timestamp of the most recent success, if any.
    pub last_success_at: Option<Instant>,
    /// Text of the most recent failure, if any.
    pub last_error: Option<String>,
    /// Until when the circuit is open (calls are skipped), if at all.
    pub circuit_open_until: Option<Instant>,
    /// How long the *next* circuit-open period will last if another trip occurs.
    ///
    /// Starts at the configured base backoff and doubles on every trip up to
    /// the configured cap; reset to the base the first time the circuit closes
    /// on a success.
    pub next_backoff: std::time::Duration,
    /// Number of times the circuit has been opened for this plugin.
    pub trip_count: u32,
}

impl PluginStats {
    /// Create fresh statistics seeded with the watchdog's configured base backoff.
    #[must_use]
    pub fn new(base_backoff: std::time::Duration) -> Self {
        Self {
            total_successes: 0,
            total_failures: 0,
            consecutive_failures: 0,
            last_success_at: None,
            last_error: None,
            circuit_open_until: None,
            next_backoff: base_backoff,
            trip_count: 0,
        }
    }

    /// Whether the circuit is open right now.
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        self.circuit_open_until.is_some_and(|until| Instant::now() < until)
    }

    /// Remaining time before the circuit closes, if open.
    #[must_use]
    pub fn circuit_remaining(&self) -> Option<std::time::Duration> {
        self.circuit_open_until.and_then(|until| {
            let now = Instant::now();
            (now < until).then(|| until - now)
        })
    }
}
