//! The Schedule Evaluator.
//!
//! A pure function of wall-clock time and config: no I/O, no state. The
//! run loop calls it every iteration and is responsible for logging only
//! on transitions.

use chrono::{Datelike, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One day's schedule override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWindow {
    /// Whether this day is scheduled at all; `false` forces inactive.
    pub enabled: bool,
    /// Window start, `"HH:MM"`.
    pub start_time: String,
    /// Window end, `"HH:MM"`.
    pub end_time: String,
}

/// A schedule: either one window applied to every day, or a per-day map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleMode {
    /// One `[start, end]` window applied every day.
    Global {
        /// Window start, `"HH:MM"`.
        start_time: String,
        /// Window end, `"HH:MM"`.
        end_time: String,
    },
    /// Per-weekday overrides; a missing day falls back to `fallback`.
    PerDay {
        /// Fallback window used for any weekday not present in `days`.
        fallback_start_time: String,
        /// Fallback window used for any weekday not present in `days`.
        fallback_end_time: String,
        /// Per-weekday overrides.
        days: std::collections::HashMap<String, DayWindow>,
    },
}

/// One schedule object: the active-window schedule or the dim-window schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Whether this schedule is in effect at all. `false` (or the object
    /// being absent entirely) means "always active".
    pub enabled: bool,
    /// The window configuration.
    #[serde(flatten)]
    pub mode: ScheduleMode,
}

/// Top-level schedule configuration read by the evaluator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// The on/off (active window) schedule. `None` means "always active".
    pub schedule: Option<ScheduleConfig>,
    /// The dim (brightness) schedule. `None` means "always nominal brightness".
    pub dim_schedule: Option<DimScheduleConfig>,
    /// Nominal brightness (0-100) used outside the dim window.
    #[serde(default = "default_nominal_brightness")]
    pub nominal_brightness: u8,
}

const fn default_nominal_brightness() -> u8 {
    100
}

/// The dim schedule: same window shape as [`ScheduleConfig`] plus a target brightness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimScheduleConfig {
    /// Whether dimming is in effect at all.
    pub enabled: bool,
    /// Brightness (0-100) to use while the dim window is active.
    pub dim_brightness: u8,
    /// The window configuration.
    #[serde(flatten)]
    pub mode: ScheduleMode,
}

/// Result of evaluating the schedule for a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDecision {
    /// Whether the panel should be on at all.
    pub display_active: bool,
    /// Brightness (0-100) that should be applied while active.
    pub target_brightness: u8,
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

fn in_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end { now >= start && now <= end } else { now >= start || now <= end }
}

fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Evaluate one schedule object (active-window or dim-window shape) against `now`.
///
/// Returns `None` when the window's time strings fail to parse, which the
/// caller should treat as "always active", logging
/// once.
fn evaluate_mode(now: chrono::DateTime<chrono::Local>, mode: &ScheduleMode) -> Option<bool> {
    match mode {
        ScheduleMode::Global { start_time, end_time } => {
            let start = parse_time(start_time)?;
            let end = parse_time(end_time)?;
            Some(in_window(now.time(), start, end))
        }
        ScheduleMode::PerDay { fallback_start_time, fallback_end_time, days } => {
            let key = weekday_key(now.weekday());
            if let Some(day) = days.get(key) {
                if !day.enabled {
                    return Some(false);
                }
                let start = parse_time(&day.start_time)?;
                let end = parse_time(&day.end_time)?;
                Some(in_window(now.time(), start, end))
            } else {
                let start = parse_time(fallback_start_time)?;
                let end = parse_time(fallback_end_time)?;
                Some(in_window(now.time(), start, end))
            }
        }
    }
}

/// Evaluate the full schedule configuration for `now`. Pure, no I/O.
#[must_use]
pub fn evaluate(now: chrono::DateTime<chrono::Local>, settings: &ScheduleSettings) -> ScheduleDecision {
    let display_active = match &settings.schedule {
        None => true,
        Some(cfg) if !cfg.enabled => true,
        Some(cfg) => evaluate_mode(now, &cfg.mode).unwrap_or_else(|| {
            warn!("schedule contains an unparsable time string; treating as always active");
            true
        }),
    };

    let target_brightness = match &settings.dim_schedule {
        None => settings.nominal_brightness,
        Some(cfg) if !cfg.enabled => settings.nominal_brightness,
        Some(cfg) => {
            let dimmed = evaluate_mode(now, &cfg.mode).unwrap_or_else(|| {
                warn!("dim schedule contains an unparsable time string; treating as always active");
                true
            });
            if dimmed { cfg.dim_brightness } else { settings.nominal_brightness }
        }
    };

    ScheduleDecision { display_active, target_brightness }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2026, 7, 31, hour, minute, 0).single().expect("valid time")
    }

    #[test]
    fn missing_schedule_is_always_active() {
        let settings = ScheduleSettings::default();
        let decision = evaluate(at(3, 0), &settings);
        assert!(decision.display_active);
        assert_eq!(decision.target_brightness, 100);
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let settings = ScheduleSettings {
            schedule: Some(ScheduleConfig {
                enabled: true,
                mode: ScheduleMode::Global { start_time: "22:00".into(), end_time: "06:00".into() },
            }),
            dim_schedule: None,
            nominal_brightness: 100,
        };
        assert!(evaluate(at(23, 0), &settings).display_active);
        assert!(evaluate(at(1, 0), &settings).display_active);
        assert!(!evaluate(at(12, 0), &settings).display_active);
    }

    #[test]
    fn overnight_one_minute_before_end_is_active() {
        let settings = ScheduleSettings {
            schedule: Some(ScheduleConfig {
                enabled: true,
                mode: ScheduleMode::Global { start_time: "22:00".into(), end_time: "06:00".into() },
            }),
            dim_schedule: None,
            nominal_brightness: 100,
        };
        assert!(evaluate(at(5, 59), &settings).display_active);
    }

    #[test]
    fn per_day_disabled_day_forces_inactive() {
        let mut days = std::collections::HashMap::new();
        days.insert("friday".to_string(), DayWindow { enabled: false, start_time: "00:00".into(), end_time: "23:59".into() });
        let settings = ScheduleSettings {
            schedule: Some(ScheduleConfig {
                enabled: true,
                mode: ScheduleMode::PerDay {
                    fallback_start_time: "07:00".into(),
                    fallback_end_time: "23:00".into(),
                    days,
                },
            }),
            dim_schedule: None,
            nominal_brightness: 100,
        };
        // 2026-07-31 is a Friday.
        assert!(!evaluate(at(10, 0), &settings).display_active);
    }

    #[test]
    fn per_day_missing_day_falls_back_to_global() {
        let settings = ScheduleSettings {
            schedule: Some(ScheduleConfig {
                enabled: true,
                mode: ScheduleMode::PerDay {
                    fallback_start_time: "07:00".into(),
                    fallback_end_time: "23:00".into(),
                    days: std::collections::HashMap::new(),
                },
            }),
            dim_schedule: None,
            nominal_brightness: 100,
        };
        assert!(evaluate(at(10, 0), &settings).display_active);
        assert!(!evaluate(at(2, 0), &settings).display_active);
    }

    #[test]
    fn invalid_time_string_degrades_to_always_active() {
        let settings = ScheduleSettings {
            schedule: Some(ScheduleConfig {
                enabled: true,
                mode: ScheduleMode::Global { start_time: "not-a-time".into(), end_time: "06:00".into() },
            }),
            dim_schedule: None,
            nominal_brightness: 100,
        };
        assert!(evaluate(at(12, 0), &settings).display_active);
    }

    #[test]
    fn dim_window_overrides_brightness() {
        let settings = ScheduleSettings {
            schedule: None,
            dim_schedule: Some(DimScheduleConfig {
                enabled: true,
                dim_brightness: 20,
                mode: ScheduleMode::Global { start_time: "21:00".into(), end_time: "23:00".into() },
            }),
            nominal_brightness: 100,
        };
        assert_eq!(evaluate(at(22, 0), &settings).target_brightness, 20);
        assert_eq!(evaluate(at(12, 0), &settings).target_brightness, 100);
    }
}
