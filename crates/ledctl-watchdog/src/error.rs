//! Error types for the watchdog (health tracking / circuit breaker) subsystem.

use thiserror::Error;

/// Errors that can occur during watchdog operations.
#[derive(Debug, Clone, Error)]
pub enum WatchdogError {
    /// Plugin not registered with the watchdog.
    #[error("plugin not registered: {0}")]
    PluginNotFound(String),

    /// Plugin is not currently circuit-open, so it cannot be released.
    #[error("plugin '{0}' circuit is not open")]
    NotOpen(String),
}

impl WatchdogError {
    /// Build a [`WatchdogError::PluginNotFound`].
    #[must_use]
    pub fn plugin_not_found(plugin_id: impl Into<String>) -> Self {
        Self::PluginNotFound(plugin_id.into())
    }

    /// Build a [`WatchdogError::NotOpen`].
    #[must_use]
    pub fn not_open(plugin_id: impl Into<String>) -> Self {
        Self::NotOpen(plugin_id.into())
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;
