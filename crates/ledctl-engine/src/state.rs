//! Engine state types.

use std::time::{SystemTime, UNIX_EPOCH};

use ledctl_plugin::ModeName;
use serde::{Deserialize, Serialize};

fn now_epoch_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

/// The rotation cursor into `available_modes`. Exclusively owned and
/// mutated by the run loop.
#[derive(Debug, Clone, Default)]
pub struct RotationState {
    /// Ordered list of modes currently available for rotation.
    pub modes: Vec<ModeName>,
    /// Index of the mode currently (or about to be) displayed.
    pub index: usize,
    /// One-shot flag: set when switching modes, cleared after the first
    /// `force_clear=true` display call of the new slice.
    pub force_change: bool,
    /// The mode currently running under a dynamic-duration slice, if any.
    pub active_dynamic_mode: Option<ModeName>,
}

impl RotationState {
    /// The mode currently selected by the cursor, if any modes are available.
    #[must_use]
    pub fn current(&self) -> Option<&ModeName> {
        self.modes.get(self.index)
    }

    /// Advance the cursor to the next mode, wrapping around.
    pub fn advance(&mut self) {
        if !self.modes.is_empty() {
            self.index = (self.index + 1) % self.modes.len();
        }
    }

    /// Skip past every mode owned by `plugin_id` (used after an exception
    /// failure), landing on the next mode owned by a different plugin, or
    /// staying put if every mode belongs to it.
    pub fn advance_past_plugin(&mut self, owner_of: impl Fn(&ModeName) -> Option<String>, plugin_id: &str) {
        if self.modes.is_empty() {
            return;
        }
        let start = self.index;
        loop {
            self.index = (self.index + 1) % self.modes.len();
            let owner = self.modes.get(self.index).and_then(|m| owner_of(m));
            if owner.as_deref() != Some(plugin_id) || self.index == start {
                break;
            }
        }
    }

    /// Set the cursor to point at `mode`, if present, and return whether it was found.
    pub fn jump_to(&mut self, mode: &ModeName) -> bool {
        if let Some(idx) = self.modes.iter().position(|m| m == mode) {
            self.index = idx;
            true
        } else {
            false
        }
    }
}

/// Status of an on-demand request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDemandStatus {
    /// No on-demand request is active.
    Idle,
    /// An on-demand request currently owns the panel.
    Active,
    /// The most recent request was rejected.
    Error,
}

/// State of an operator-initiated on-demand request.
#[derive(Debug, Clone)]
pub struct OnDemandState {
    /// The request id currently owning the panel, if active.
    pub request_id: Option<String>,
    /// The plugin currently owning the panel, if active.
    pub plugin_id: Option<String>,
    /// Ordered rotation of modes inside this on-demand request.
    pub modes: Vec<ModeName>,
    /// Cursor into `modes`.
    pub mode_index: usize,
    /// Whether this request has no expiry (only an explicit stop ends it).
    pub pinned: bool,
    /// When the request was activated.
    pub started_at: Option<f64>,
    /// Absolute expiry time, if not pinned.
    pub expires_at: Option<f64>,
    /// Rotation index to resume at once this request ends.
    pub resume_index: Option<usize>,
    /// Current status.
    pub status: OnDemandStatus,
    /// Last event name for the control plane, e.g. `"started"`, `"expired"`.
    pub last_event: Option<String>,
    /// Last error code, e.g. `"unknown-plugin"`.
    pub last_error: Option<String>,
}

impl Default for OnDemandState {
    fn default() -> Self {
        Self {
            request_id: None,
            plugin_id: None,
            modes: Vec::new(),
            mode_index: 0,
            pinned: false,
            started_at: None,
            expires_at: None,
            resume_index: None,
            status: OnDemandStatus::Idle,
            last_event: None,
            last_error: None,
        }
    }
}

impl OnDemandState {
    /// Whether an on-demand request currently owns the panel.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OnDemandStatus::Active
    }

    /// Seconds remaining before this request expires, if it has an expiry.
    #[must_use]
    pub fn remaining(&self) -> Option<f64> {
        self.expires_at.map(|expires| (expires - now_epoch_secs()).max(0.0))
    }

    /// Whether this request has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires| now_epoch_secs() >= expires)
    }

    /// The mode currently selected within the on-demand rotation.
    #[must_use]
    pub fn current_mode(&self) -> Option<&ModeName> {
        self.modes.get(self.mode_index)
    }

    /// Reset to the idle state, recording `reason` as the last event.
    pub fn clear(&mut self, reason: impl Into<String>) {
        *self = Self { last_event: Some(reason.into()), resume_index: self.resume_index, ..Self::default() };
    }

    /// Transition to the error state with `code` as the last error.
    pub fn set_error(&mut self, code: impl Into<String>) {
        let resume_index = self.resume_index;
        *self = Self {
            status: OnDemandStatus::Error,
            last_error: Some(code.into()),
            resume_index,
            ..Self::default()
        };
    }
}

/// A transient WiFi connectivity banner.
#[derive(Debug, Clone, Deserialize)]
pub struct WifiBannerRecord {
    /// Message text, must be non-empty.
    pub message: String,
    /// Epoch seconds the record was created, must be positive.
    pub timestamp: f64,
    /// How long the banner should be shown, seconds, 0-300.
    pub duration: f64,
}

/// Validated, in-memory banner state.
#[derive(Debug, Clone)]
pub struct WifiBannerState {
    /// The message to display.
    pub message: String,
    /// When the record was created.
    pub created_at: f64,
    /// How long the banner lives for.
    pub duration_s: f64,
    /// Absolute expiry.
    pub expires_at: f64,
}

impl WifiBannerState {
    /// Validate a raw record: UTF-8 JSON (handled by
    /// the caller's deserialization), non-empty message, positive
    /// timestamp, duration in `[0, 300]`.
    #[must_use]
    pub fn from_record(record: WifiBannerRecord) -> Option<Self> {
        if record.message.trim().is_empty() {
            return None;
        }
        if record.timestamp <= 0.0 {
            return None;
        }
        if !(0.0..=300.0).contains(&record.duration) {
            return None;
        }
        Some(Self {
            message: record.message,
            created_at: record.timestamp,
            duration_s: record.duration,
            expires_at: record.timestamp + record.duration,
        })
    }

    /// Whether the banner is still within its display window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        now_epoch_secs() <= self.expires_at
    }
}

/// Current backlight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessState {
    /// Current applied brightness, 0-100.
    pub current: u8,
    /// Whether `current` reflects the dim schedule rather than nominal.
    pub is_dimmed: bool,
}

impl Default for BrightnessState {
    fn default() -> Self {
        Self { current: 100, is_dimmed: false }
    }
}
