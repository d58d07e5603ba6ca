//! The Run Loop: orchestrates the Schedule Evaluator, Request Channel,
//! Arbiter, and Plugin Executor into the single sequence of panel updates
//! described below.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use ledctl_plugin::{DisplayOutcome, ModeName, PluginCapabilities, PluginRegistry};
use ledctl_watchdog::Watchdog;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::arbiter::{self, ArbiterDecision, ArbiterReason};
use crate::config::EngineConfig;
use crate::executor::PluginExecutor;
use crate::request_channel::{RequestChannel, RequestChannelExt};
use crate::schedule;
use crate::state::{BrightnessState, OnDemandState, OnDemandStatus, RotationState, WifiBannerState};
use crate::wifi_banner;

const IDLE_SLEEP_TICK: Duration = Duration::from_secs(5);
const IDLE_SLEEP_TOTAL: Duration = Duration::from_secs(60);
const BANNER_SLEEP: Duration = Duration::from_millis(500);
const FALLBACK_SLICE: Duration = Duration::from_secs(15);
const FALLBACK_DYNAMIC_CAP: Duration = Duration::from_secs(180);
const CYCLE_COMPLETE_GRACE: Duration = Duration::from_millis(500);

/// On-demand start/stop directive read from the request channel.
#[derive(Debug, Clone, serde::Deserialize)]
struct OnDemandRequest {
    request_id: String,
    action: String,
    plugin_id: Option<String>,
    mode: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    pinned: bool,
}

/// Wire format for `display_on_demand_state`.
#[derive(Debug, Clone, Serialize)]
struct OnDemandStateWire {
    active: bool,
    status: &'static str,
    mode: Option<String>,
    plugin_id: Option<String>,
    modes: Vec<String>,
    mode_index: usize,
    requested_at: Option<f64>,
    expires_at: Option<f64>,
    remaining: Option<f64>,
    pinned: bool,
    last_event: Option<String>,
    last_error: Option<String>,
    last_updated: f64,
}

fn epoch_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Owns every piece of mutable engine state and drives the run loop.
pub struct RunLoop<C: RequestChannel> {
    registry: PluginRegistry,
    watchdog: Watchdog,
    channel: Arc<C>,
    config: EngineConfig,
    rotation: RotationState,
    on_demand: OnDemandState,
    brightness: BrightnessState,
    wifi_banner: Option<WifiBannerState>,
    schedule_active: Option<bool>,
    reload_rx: Option<Receiver<EngineConfig>>,
}

/// What happened during one call to [`RunLoop::tick`], for tests and callers
/// that want to decide how long to sleep between iterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Schedule is inactive; caller should sleep ~60s (tickable).
    Idle,
    /// No modes are available to render at all; caller should sleep ~60s.
    Empty,
    /// A WiFi banner was rendered; caller should sleep ~0.5s.
    WifiBanner,
    /// The ticker compositor ran (and either completed a pass or yielded).
    Ticker,
    /// One mode completed its slice.
    Rendered {
        /// The mode that was displayed.
        mode: ModeName,
        /// The plugin that owns it.
        plugin_id: String,
    },
}

impl<C: RequestChannel> RunLoop<C> {
    /// Build a run loop over an already-populated registry.
    #[must_use]
    pub fn new(registry: PluginRegistry, watchdog: Watchdog, channel: Arc<C>, config: EngineConfig) -> Self {
        let modes = registry.available_modes();
        Self {
            registry,
            watchdog,
            channel,
            config,
            rotation: RotationState { modes, index: 0, force_change: true, active_dynamic_mode: None },
            on_demand: OnDemandState::default(),
            brightness: BrightnessState::default(),
            wifi_banner: None,
            schedule_active: None,
            reload_rx: None,
        }
    }

    /// Wire up a channel the config watcher can push freshly-reloaded
    /// configuration through; applied on this loop's own thread between
    /// iterations, never concurrently with a plugin's `display` call.
    pub fn set_config_reload_channel(&mut self, rx: Receiver<EngineConfig>) {
        self.reload_rx = Some(rx);
    }

    fn apply_pending_config_reload(&mut self) {
        let Some(rx) = &self.reload_rx else { return };
        let mut latest = None;
        while let Ok(config) = rx.try_recv() {
            latest = Some(config);
        }
        let Some(new_config) = latest else { return };

        info!("applying hot-reloaded configuration");
        self.config = new_config;
        let raw = serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null);
        for entry in self.registry.entries_mut() {
            entry.instance.on_config_change(&raw);
        }
    }

    /// Run until `shutdown` is set, performing a graceful panel-clear on exit
    /// (only a fatal signal breaks the loop).
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            match self.tick() {
                TickOutcome::Idle | TickOutcome::Empty => sleep_tickable(self, IDLE_SLEEP_TOTAL, IDLE_SLEEP_TICK, shutdown),
                TickOutcome::WifiBanner => sleep_tickable(self, BANNER_SLEEP, BANNER_SLEEP, shutdown),
                TickOutcome::Ticker | TickOutcome::Rendered { .. } => {}
            }
        }
        info!("run loop received shutdown signal; clearing panel and exiting");
    }

    /// Run one iteration of the engine's 13-step sequence.
    pub fn tick(&mut self) -> TickOutcome {
        self.apply_pending_config_reload();
        self.poll_on_demand_requests();
        self.check_on_demand_expiration();
        self.tick_plugin_updates();

        let now = Local::now();
        let decision_basis = schedule::evaluate(now, &self.config.schedule);

        let display_active = if self.on_demand.is_active() && !decision_basis.display_active {
            true
        } else {
            decision_basis.display_active
        };

        if self.schedule_active != Some(display_active) {
            info!(display_active, "schedule transition");
            self.schedule_active = Some(display_active);
        }

        if !display_active {
            return TickOutcome::Idle;
        }

        if decision_basis.target_brightness != self.brightness.current {
            self.brightness =
                BrightnessState { current: decision_basis.target_brightness, is_dimmed: decision_basis.target_brightness < self.config.display.brightness };
        }

        if self.registry.available_modes().is_empty() {
            warn!("no display modes available; sleeping");
            return TickOutcome::Empty;
        }

        let wifi_status_path = self.config.wifi_status_path.clone();
        let fresh_banner = wifi_status_path.as_deref().and_then(wifi_banner::read_banner);
        if let Some(path) = wifi_status_path.as_deref() {
            wifi_banner::cleanup_if_expired(path, fresh_banner.as_ref());
        }
        self.wifi_banner = fresh_banner.filter(WifiBannerState::is_valid);

        let ticker_config = self.config.display.vegas_scroll.clone();
        let decision = arbiter::decide(&self.registry, &self.rotation, &self.on_demand, self.wifi_banner.as_ref(), Some(&ticker_config));

        match decision {
            ArbiterDecision::Empty => TickOutcome::Empty,
            ArbiterDecision::WifiBanner => TickOutcome::WifiBanner,
            ArbiterDecision::Ticker => {
                self.run_ticker_pass(&ticker_config);
                TickOutcome::Ticker
            }
            ArbiterDecision::Render { mode, plugin_id, reason } => self.run_slice(mode, plugin_id, reason),
        }
    }

    fn run_ticker_pass(&mut self, config: &crate::ticker::TickerConfig) {
        let channel = Arc::clone(&self.channel);
        crate::ticker::run_compositor_pass(
            &self.registry,
            config,
            |_plugin_id, _frame| {},
            || channel.get("display_on_demand_request").is_some(),
            |_plugin_id| Vec::new(),
        );
    }

    fn run_slice(&mut self, mode: ModeName, plugin_id: String, reason: ArbiterReason) -> TickOutcome {
        if reason == ArbiterReason::LivePriority && self.rotation.current() != Some(&mode) {
            self.rotation.jump_to(&mode);
            self.rotation.force_change = true;
        }

        let Some(entry) = self.registry.by_id_mut(&plugin_id) else {
            warn!(plugin_id, "arbiter chose a mode owned by an unknown plugin");
            return TickOutcome::Empty;
        };
        let capabilities = entry.capabilities;
        let is_dynamic = capabilities.contains(PluginCapabilities::DYNAMIC_DURATION);
        let is_scrolling = capabilities.contains(PluginCapabilities::SCROLLING);

        let base_duration = entry.instance.get_display_duration(&mode);
        let global_cap = self.config.dynamic_duration_cap();
        let on_demand_remaining = self.on_demand.remaining().map(Duration::from_secs_f64);

        let (target, min_dur, max_dur) = if is_dynamic {
            let mut cap = entry.instance.get_dynamic_duration_cap().min(global_cap);
            if let Some(remaining) = on_demand_remaining {
                cap = cap.min(remaining);
            }
            let cycle = entry.instance.get_cycle_duration(&mode);
            let target = cycle.unwrap_or(cap);
            let min_dur = base_duration;
            let max_dur = min_dur.max(target.min(cap));
            (target, min_dur, max_dur)
        } else {
            (base_duration, base_duration, base_duration)
        };

        let (target, min_dur, max_dur) = sanitize_budget(target, min_dur, max_dur);

        if self.rotation.active_dynamic_mode.as_ref() != Some(&mode) {
            if is_dynamic {
                entry.instance.reset_cycle_state();
            }
            self.rotation.active_dynamic_mode = if is_dynamic { Some(mode.clone()) } else { None };
        }

        let tick_interval = if is_scrolling { Duration::from_millis(8) } else { Duration::from_secs(1) };
        let start = Instant::now();
        let mut first_frame = true;
        let mut exception_failure = false;
        let mut mode_changed_externally = false;

        loop {
            let force_clear = self.rotation.force_change && first_frame;
            first_frame = false;

            let Some(entry) = self.registry.by_id_mut(&plugin_id) else { break };
            let executor = PluginExecutor::new(&self.watchdog);
            let outcome = executor.execute_display(&plugin_id, entry.instance.as_mut(), &mode, force_clear);

            std::thread::sleep(tick_interval);
            self.tick_plugin_updates();
            self.poll_on_demand_requests();
            self.check_on_demand_expiration();

            if self.current_mode_for(reason).as_ref() != Some(&mode) {
                mode_changed_externally = true;
                break;
            }

            let elapsed = start.elapsed();
            if elapsed >= target {
                break;
            }

            if is_dynamic && elapsed >= min_dur + CYCLE_COMPLETE_GRACE {
                let cycle_complete =
                    self.registry.by_id(&plugin_id).is_some_and(|e| e.instance.is_cycle_complete());
                if cycle_complete {
                    break;
                }
            }

            match outcome {
                DisplayOutcome::NoContent => {
                    if !is_dynamic {
                        break;
                    }
                }
                DisplayOutcome::Failed(_) => {
                    exception_failure = true;
                    break;
                }
                DisplayOutcome::Rendered => {}
            }
        }

        if !is_dynamic && !mode_changed_externally {
            let elapsed = start.elapsed();
            if elapsed < max_dur {
                self.sleep_remaining(max_dur - elapsed);
            }
        }

        self.publish_on_demand_state();

        if reason == ArbiterReason::Rotation {
            if exception_failure {
                let registry = &self.registry;
                self.rotation.advance_past_plugin(|m| registry.owner_of(m).map(|e| e.manifest.id.clone()), &plugin_id);
            } else {
                self.rotation.advance();
            }
        }

        self.rotation.force_change = false;
        TickOutcome::Rendered { mode, plugin_id }
    }

    fn sleep_remaining(&mut self, remaining: Duration) {
        let ticks = (remaining.as_secs_f64() / IDLE_SLEEP_TICK.as_secs_f64()).ceil().max(1.0) as u32;
        let per_tick = Duration::from_secs_f64(remaining.as_secs_f64() / f64::from(ticks));
        for _ in 0..ticks {
            std::thread::sleep(per_tick.min(Duration::from_millis(250)));
            self.tick_plugin_updates();
            self.poll_on_demand_requests();
            self.check_on_demand_expiration();
        }
    }

    fn current_mode_for(&self, reason: ArbiterReason) -> Option<ModeName> {
        match reason {
            ArbiterReason::OnDemand => self.on_demand.current_mode().cloned(),
            _ => self.rotation.current().cloned(),
        }
    }

    fn tick_plugin_updates(&mut self) {
        let watchdog = &self.watchdog;
        for entry in self.registry.entries_mut() {
            if !entry.manifest.enabled || watchdog.should_skip(&entry.manifest.id) {
                continue;
            }
            let executor = PluginExecutor::new(watchdog);
            executor.execute_update(&entry.manifest.id, entry.instance.as_mut());
        }
    }

    fn poll_on_demand_requests(&mut self) {
        let Some(request) = self.channel.get_typed::<OnDemandRequest>("display_on_demand_request") else {
            return;
        };

        let already_processed = self
            .channel
            .get_typed::<String>("display_on_demand_processed_id")
            .is_some_and(|seen| seen == request.request_id);

        if request.action == "stop" {
            self.channel.set_typed("display_on_demand_processed_id", &request.request_id);
            self.clear_on_demand("requested-stop");
            return;
        }

        if already_processed {
            debug!(request_id = %request.request_id, "on-demand start request already processed; ignoring");
            return;
        }

        self.channel.set_typed("display_on_demand_processed_id", &request.request_id);
        self.activate_on_demand(request);
    }

    fn activate_on_demand(&mut self, request: OnDemandRequest) {
        let Some(plugin_id) = request.plugin_id.clone() else {
            self.on_demand.set_error("missing-mode");
            self.publish_on_demand_state();
            return;
        };

        if self.registry.by_id(&plugin_id).is_none() {
            self.on_demand.set_error("unknown-plugin");
            self.publish_on_demand_state();
            return;
        }

        self.registry.temporarily_enable(&plugin_id);

        let modes = self.registry.by_id(&plugin_id).map(|e| e.instance.modes()).unwrap_or_default();
        if modes.is_empty() {
            self.on_demand.set_error("invalid-mode");
            self.publish_on_demand_state();
            return;
        }

        let requested_mode = request.mode.map(ModeName::new);
        if let Some(requested) = &requested_mode {
            if !modes.contains(requested) {
                self.on_demand.set_error("invalid-mode");
                self.publish_on_demand_state();
                return;
            }
        }

        let mode_index = requested_mode.as_ref().and_then(|m| modes.iter().position(|candidate| candidate == m)).unwrap_or(0);
        let now = epoch_now();

        self.on_demand = OnDemandState {
            request_id: Some(request.request_id),
            plugin_id: Some(plugin_id),
            modes,
            mode_index,
            pinned: request.pinned || request.duration.is_none(),
            started_at: Some(now),
            expires_at: request.duration.map(|d| now + d),
            resume_index: Some(self.rotation.index),
            status: OnDemandStatus::Active,
            last_event: Some("started".to_string()),
            last_error: None,
        };
        self.rotation.force_change = true;
        self.publish_on_demand_state();
    }

    fn check_on_demand_expiration(&mut self) {
        if self.on_demand.is_active() && self.on_demand.is_expired() {
            self.clear_on_demand("expired");
        }
    }

    fn clear_on_demand(&mut self, reason: &str) {
        if !self.on_demand.is_active() && self.on_demand.status == OnDemandStatus::Idle {
            self.on_demand.last_event = Some("stop-request-ignored".to_string());
            self.publish_on_demand_state();
            return;
        }

        let resume_index = self.on_demand.resume_index;
        self.on_demand.clear(reason);

        if let Some(resume) = resume_index {
            if !self.rotation.modes.is_empty() {
                self.rotation.index = resume % self.rotation.modes.len();
            }
        }
        self.rotation.force_change = true;
        self.publish_on_demand_state();
    }

    fn publish_on_demand_state(&self) {
        let wire = OnDemandStateWire {
            active: self.on_demand.is_active(),
            status: match self.on_demand.status {
                OnDemandStatus::Idle => "idle",
                OnDemandStatus::Active => "active",
                OnDemandStatus::Error => "error",
            },
            mode: self.on_demand.current_mode().map(ToString::to_string),
            plugin_id: self.on_demand.plugin_id.clone(),
            modes: self.on_demand.modes.iter().map(ToString::to_string).collect(),
            mode_index: self.on_demand.mode_index,
            requested_at: self.on_demand.started_at,
            expires_at: self.on_demand.expires_at,
            remaining: self.on_demand.remaining(),
            pinned: self.on_demand.pinned,
            last_event: self.on_demand.last_event.clone(),
            last_error: self.on_demand.last_error.clone(),
            last_updated: epoch_now(),
        };
        self.channel.set_typed("display_on_demand_state", &wire);
    }
}

fn sanitize_budget(target: Duration, min_dur: Duration, max_dur: Duration) -> (Duration, Duration, Duration) {
    if min_dur.is_zero() || max_dur.is_zero() || target.is_zero() {
        warn!("non-positive slice duration computed; falling back to safe defaults");
        (FALLBACK_SLICE, FALLBACK_SLICE, FALLBACK_DYNAMIC_CAP)
    } else {
        (target, min_dur, max_dur)
    }
}

fn sleep_tickable<C: RequestChannel>(run_loop: &mut RunLoop<C>, total: Duration, interval: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    while remaining > Duration::ZERO && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(interval);
        std::thread::sleep(step);
        run_loop.tick_plugin_updates();
        run_loop.poll_on_demand_requests();
        run_loop.check_on_demand_expiration();
        remaining = remaining.saturating_sub(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_channel::InMemoryRequestChannel;
    use ledctl_plugin::{Plugin, PluginManifest};

    struct Clock;
    impl Plugin for Clock {
        fn id(&self) -> &str {
            "clock"
        }
        fn modes(&self) -> Vec<ModeName> {
            vec![ModeName::new("clock")]
        }
        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            DisplayOutcome::Rendered
        }
        fn get_display_duration(&self, _mode: &ModeName) -> Duration {
            Duration::from_millis(30)
        }
    }

    struct Weather;
    impl Plugin for Weather {
        fn id(&self) -> &str {
            "weather"
        }
        fn modes(&self) -> Vec<ModeName> {
            vec![ModeName::new("weather_current")]
        }
        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            DisplayOutcome::Rendered
        }
        fn get_display_duration(&self, _mode: &ModeName) -> Duration {
            Duration::from_millis(30)
        }
    }

    fn run_loop() -> RunLoop<InMemoryRequestChannel> {
        let mut registry = PluginRegistry::new();
        registry.register(PluginManifest::new("clock", "Clock"), Box::new(Clock)).expect("register clock");
        registry.register(PluginManifest::new("weather", "Weather"), Box::new(Weather)).expect("register weather");
        RunLoop::new(registry, Watchdog::default(), Arc::new(InMemoryRequestChannel::new()), EngineConfig::default())
    }

    #[test]
    fn rotation_advances_between_ticks() {
        let mut rl = run_loop();
        let first = rl.tick();
        let second = rl.tick();
        match (first, second) {
            (TickOutcome::Rendered { mode: m1, .. }, TickOutcome::Rendered { mode: m2, .. }) => {
                assert_ne!(m1, m2);
            }
            other => panic!("expected two renders, got {other:?}"),
        }
    }

    #[test]
    fn on_demand_start_preempts_rotation_and_stop_resumes() {
        let mut rl = run_loop();
        rl.channel.set(
            "display_on_demand_request",
            serde_json::json!({"request_id": "r1", "action": "start", "plugin_id": "weather", "duration": 5}),
        );
        let tick = rl.tick();
        match tick {
            TickOutcome::Rendered { mode, plugin_id } => {
                assert_eq!(mode.as_str(), "weather_current");
                assert_eq!(plugin_id, "weather");
            }
            other => panic!("expected on-demand render, got {other:?}"),
        }
        assert!(rl.on_demand.is_active());

        rl.channel.set("display_on_demand_request", serde_json::json!({"request_id": "r1", "action": "stop"}));
        rl.tick();
        assert!(!rl.on_demand.is_active());
    }

    #[test]
    fn unknown_plugin_on_demand_reports_error_without_touching_rotation() {
        let mut rl = run_loop();
        let index_before = rl.rotation.index;
        rl.channel.set(
            "display_on_demand_request",
            serde_json::json!({"request_id": "r2", "action": "start", "plugin_id": "does_not_exist"}),
        );
        rl.tick();
        assert_eq!(rl.on_demand.status, OnDemandStatus::Error);
        assert_eq!(rl.on_demand.last_error.as_deref(), Some("unknown-plugin"));
        assert_eq!(rl.rotation.index, index_before);
    }

    #[test]
    fn stop_on_idle_engine_is_a_no_op() {
        let mut rl = run_loop();
        rl.channel.set("display_on_demand_request", serde_json::json!({"request_id": "r3", "action": "stop"}));
        rl.tick();
        assert_eq!(rl.on_demand.status, OnDemandStatus::Idle);
        assert_eq!(rl.on_demand.last_event.as_deref(), Some("stop-request-ignored"));
    }

    #[test]
    fn empty_registry_sleeps_without_rendering() {
        let mut rl = RunLoop::new(
            PluginRegistry::new(),
            Watchdog::default(),
            Arc::new(InMemoryRequestChannel::new()),
            EngineConfig::default(),
        );
        assert_eq!(rl.tick(), TickOutcome::Empty);
    }
}
