//! The optional Ticker Compositor.
//!
//! Composes a continuously scrolling ribbon from frames contributed by
//! every participating plugin, instead of giving one plugin at a time the
//! full panel. Drives its own frame timer and yields control periodically
//! via a caller-supplied interrupt probe so the run loop can service
//! higher-priority signals without the compositor needing to know about
//! them directly.

use std::time::Duration;

use ledctl_plugin::{ModeName, PluginRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ticker configuration (maps to the `display.vegas_scroll` config key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Whether the ticker is enabled at all.
    pub enabled: bool,
    /// Pixels scrolled per frame.
    pub scroll_speed: u32,
    /// Target frames per second for the ticker's own timer.
    pub target_fps: u32,
    /// How many frames of look-ahead to buffer per plugin.
    pub buffer_ahead: u32,
    /// Plugin ids in display priority order; plugins not listed are appended
    /// in registry discovery order.
    pub plugin_order: Vec<String>,
    /// Plugin ids excluded from the ticker entirely.
    pub excluded_plugins: Vec<String>,
    /// How many frames to draw before polling the interrupt probe.
    pub yield_every_frames: u32,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scroll_speed: 2,
            target_fps: 30,
            buffer_ahead: 3,
            plugin_order: Vec::new(),
            excluded_plugins: Vec::new(),
            yield_every_frames: 10,
        }
    }
}

/// One frame contributed by a plugin to the ticker ribbon.
#[derive(Debug, Clone)]
pub struct TickerFrame {
    /// The plugin that produced this frame.
    pub plugin_id: String,
    /// Opaque frame payload (pixel buffer); not modeled further here since
    /// the hardware abstraction that consumes it is out of scope.
    pub payload: Vec<u8>,
}

/// A plugin's hook for contributing frames to the ticker (separate from
/// [`ledctl_plugin::Plugin`] since not every plugin participates in the
/// ticker and the bag-of-images shape is specific to this compositor).
pub trait TickerSource {
    /// Produce the next bag of frames this plugin wants shown in the ribbon.
    fn ticker_frames(&mut self) -> Vec<TickerFrame>;
}

fn ordered_participants<'a>(registry: &'a PluginRegistry, config: &TickerConfig) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();

    for id in &config.plugin_order {
        if config.excluded_plugins.contains(id) {
            continue;
        }
        if registry.by_id(id).is_some() && seen.insert(id.clone()) {
            ordered.push(id.as_str());
        }
    }
    for entry in registry.entries() {
        let id = &entry.manifest.id;
        if config.excluded_plugins.contains(id) {
            continue;
        }
        if entry.manifest.enabled && seen.insert(id.clone()) {
            ordered.push(id.as_str());
        }
    }
    ordered
}

/// Run one compositor pass: draw frames from every participating plugin in
/// priority order, yielding every `yield_every_frames` frames by consulting
/// `should_interrupt`.
///
/// Returns `true` if the compositor yielded because `should_interrupt`
/// fired (the caller should drop back to per-iteration arbitration),
/// `false` if it completed a full pass through every participant
/// uninterrupted.
pub fn run_compositor_pass(
    registry: &PluginRegistry,
    config: &TickerConfig,
    mut draw_frame: impl FnMut(&str, &TickerFrame),
    mut should_interrupt: impl FnMut() -> bool,
    mut next_frames: impl FnMut(&str) -> Vec<TickerFrame>,
) -> bool {
    let participants = ordered_participants(registry, config);
    let tick = Duration::from_secs_f64(1.0 / f64::from(config.target_fps.max(1)));
    let mut frame_count: u32 = 0;

    for plugin_id in participants {
        for frame in next_frames(plugin_id) {
            draw_frame(plugin_id, &frame);
            frame_count += 1;
            std::thread::sleep(tick);

            if frame_count % config.yield_every_frames.max(1) == 0 && should_interrupt() {
                debug!(plugin_id, frame_count, "ticker compositor yielding to higher-priority signal");
                return true;
            }
        }
    }
    false
}
