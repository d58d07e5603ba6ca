//! Engine-wide configuration: schema and layered loader.

use std::path::PathBuf;
use std::time::Duration;

use ledctl_errors::ConfigError;
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleSettings;
use crate::ticker::TickerConfig;

/// Hardware-facing display settings (brightness, dynamic duration cap).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Nominal brightness, 0-100.
    pub brightness: u8,
    /// Global cap, in seconds, on any dynamic-duration slice.
    pub dynamic_duration_cap_s: f64,
    /// Ticker / "vegas scroll" compositor configuration.
    pub vegas_scroll: TickerConfig,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { brightness: 100, dynamic_duration_cap_s: 180.0, vegas_scroll: TickerConfig::default() }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Schedule and dim-schedule settings.
    pub schedule: ScheduleSettings,
    /// Display/brightness/ticker settings.
    pub display: DisplaySettings,
    /// Path to the WiFi status banner file, if the banner feature is used.
    pub wifi_status_path: Option<PathBuf>,
    /// Path to persist the request channel snapshot, if persistence is desired.
    pub request_channel_snapshot_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Validate invariants that would otherwise silently produce nonsensical
    /// behavior (negative durations, out-of-range brightness).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.brightness > 100 {
            return Err(ConfigError::invalid_value("display.hardware.brightness", "must be 0-100"));
        }
        if self.display.dynamic_duration_cap_s <= 0.0 {
            return Err(ConfigError::invalid_value(
                "display.dynamic_duration.max_duration_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Load configuration from `path`, falling back to defaults (and
    /// persisting them) if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but can't be read or
    /// parsed, or if the file cannot be created when falling back to
    /// defaults.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::unreadable(path, e.to_string()))?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| ConfigError::malformed(path, e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Persist configuration to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the directory or file cannot be written.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::unreadable(path, e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::malformed(path, e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::unreadable(path, e.to_string()))?;
        Ok(())
    }

    /// The global dynamic-duration cap as a [`Duration`].
    #[must_use]
    pub fn dynamic_duration_cap(&self) -> Duration {
        Duration::from_secs_f64(self.display.dynamic_duration_cap_s.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_brightness() {
        let mut config = EngineConfig::default();
        config.display.brightness = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn load_creates_default_when_missing() {
        let dir = std::env::temp_dir().join(format!("ledctl-config-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = EngineConfig::load(&path).expect("load creates default");
        assert_eq!(config.display.brightness, 100);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
