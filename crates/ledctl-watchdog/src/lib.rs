//! Health tracking and circuit breaker for plugin execution.
//!
//! Every call the engine makes into a plugin is accounted for here: a run
//! of consecutive failures opens a circuit that causes subsequent calls to
//! be skipped for a backed-off interval, closing again on the first
//! success.

mod config;
mod error;
mod stats;
mod watchdog;

pub use config::WatchdogConfig;
pub use error::{WatchdogError, WatchdogResult};
pub use stats::PluginStats;
pub use watchdog::{HealthSummary, Watchdog};
