//! Shared error types for the LED panel controller.
//!
//! Each crate in this workspace defines errors for the failures that can
//! cross its own boundary. This crate provides the top-level error that
//! wraps all of them for `main`'s `Result` return, plus a couple of error
//! kinds (config, schedule) that don't have a more specific home.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by configuration loading and validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path:?}: {reason}")]
    Unreadable {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// The config file could not be parsed as JSON.
    #[error("failed to parse config file {path:?}: {reason}")]
    Malformed {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// A config value failed validation (e.g. negative duration, out-of-range brightness).
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `display.hardware.brightness`.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::Unreadable`].
    #[must_use]
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Unreadable { path: path.into(), reason: reason.into() }
    }

    /// Build an [`ConfigError::Malformed`].
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed { path: path.into(), reason: reason.into() }
    }

    /// Build an [`ConfigError::InvalidValue`].
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue { field: field.into(), reason: reason.into() }
    }
}

/// Errors surfaced by the request channel (the control-plane coupling).
///
/// Per the error taxonomy these are deliberately narrow: most request
/// channel failures are handled inline by the run loop (log and retry next
/// iteration) rather than propagated, so this type only covers failures at
/// setup time (e.g. the snapshot file's parent directory can't be created).
#[derive(Debug, Clone, Error)]
pub enum RequestChannelError {
    /// The on-disk snapshot could not be written.
    #[error("failed to persist request channel snapshot to {path:?}: {reason}")]
    SnapshotWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },

    /// A timeout elapsed waiting for a blocking receive.
    #[error("timed out after {0:?} waiting for a request channel update")]
    Timeout(Duration),
}

/// Top-level error type returned from `main` and setup code.
#[derive(Debug, Error)]
pub enum LedCtlError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request channel setup failed.
    #[error(transparent)]
    RequestChannel(#[from] RequestChannelError),

    /// Plugin registration failed.
    #[error("plugin registration failed: {0}")]
    PluginRegistration(String),

    /// No plugins directory or manifest could be found at startup.
    #[error("no plugins available at {0:?}")]
    NoPlugins(PathBuf),
}

/// Result alias used at fallible crate boundaries.
pub type Result<T> = std::result::Result<T, LedCtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_includes_field() {
        let err = ConfigError::invalid_value("display.hardware.brightness", "must be 0-100");
        assert!(err.to_string().contains("display.hardware.brightness"));
    }

    #[test]
    fn ledctl_error_wraps_config_error() {
        let err: LedCtlError = ConfigError::unreadable("/tmp/x.json", "not found").into();
        assert!(matches!(err, LedCtlError::Config(_)));
    }
}
