//! The Arbiter: picks the next mode to render.
//!
//! Never sleeps, never touches I/O; it is a pure decision function over the
//! registry and the current state objects. The run loop is responsible for
//! acting on its decision (timing, rendering, rotation advance).

use ledctl_plugin::{ModeName, PluginRegistry};

use crate::state::{OnDemandState, RotationState, WifiBannerState};
use crate::ticker::TickerConfig;

/// Why the arbiter chose the mode it did, used for logging and state publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterReason {
    /// An on-demand request owns the panel.
    OnDemand,
    /// A WiFi status banner is being shown.
    WifiBanner,
    /// A plugin claimed live priority.
    LivePriority,
    /// The ticker compositor is running.
    Ticker,
    /// Normal rotation.
    Rotation,
}

/// The arbiter's decision for one iteration.
#[derive(Debug, Clone)]
pub enum ArbiterDecision {
    /// Render this mode, owned by this plugin, for the stated reason.
    Render {
        /// The mode to display.
        mode: ModeName,
        /// The plugin that owns it.
        plugin_id: String,
        /// Why this mode was chosen.
        reason: ArbiterReason,
    },
    /// Render the WiFi banner text instead of dispatching to a plugin.
    WifiBanner,
    /// Run the ticker compositor instead of a single mode.
    Ticker,
    /// No mode is available to render at all.
    Empty,
}

fn scan_live_priority(registry: &PluginRegistry) -> Option<(ModeName, String)> {
    for entry in registry.entries() {
        if !entry.manifest.enabled {
            continue;
        }
        if !(entry.instance.has_live_priority() && entry.instance.has_live_content()) {
            continue;
        }
        let available = registry.available_modes();
        for candidate in entry.instance.get_live_modes() {
            if available.contains(&candidate) {
                return Some((candidate, entry.manifest.id.clone()));
            }
        }
        for mode in entry.instance.modes() {
            if mode.is_live_suffixed() {
                return Some((mode, entry.manifest.id.clone()));
            }
        }
    }
    None
}

/// Choose the next mode to render, in the fixed priority order:
/// 1. on-demand active, 2. WiFi banner, 3. live priority, 4. ticker, 5. rotation.
#[must_use]
pub fn decide(
    registry: &PluginRegistry,
    rotation: &RotationState,
    on_demand: &OnDemandState,
    wifi_banner: Option<&WifiBannerState>,
    ticker: Option<&TickerConfig>,
) -> ArbiterDecision {
    if on_demand.is_active() {
        if let (Some(mode), Some(plugin_id)) = (on_demand.current_mode(), &on_demand.plugin_id) {
            return ArbiterDecision::Render {
                mode: mode.clone(),
                plugin_id: plugin_id.clone(),
                reason: ArbiterReason::OnDemand,
            };
        }
    }

    if wifi_banner.is_some_and(WifiBannerState::is_valid) {
        return ArbiterDecision::WifiBanner;
    }

    if let Some((mode, plugin_id)) = scan_live_priority(registry) {
        return ArbiterDecision::Render { mode, plugin_id, reason: ArbiterReason::LivePriority };
    }

    if ticker.is_some_and(|t| t.enabled) {
        return ArbiterDecision::Ticker;
    }

    match rotation.current() {
        Some(mode) => match registry.owner_of(mode) {
            Some(entry) => ArbiterDecision::Render {
                mode: mode.clone(),
                plugin_id: entry.manifest.id.clone(),
                reason: ArbiterReason::Rotation,
            },
            None => ArbiterDecision::Empty,
        },
        None => ArbiterDecision::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledctl_plugin::{DisplayOutcome, Plugin, PluginCapabilities, PluginManifest};

    struct LivePlugin {
        live: bool,
    }
    impl Plugin for LivePlugin {
        fn id(&self) -> &str {
            "scoreboard"
        }
        fn capabilities(&self) -> PluginCapabilities {
            PluginCapabilities::LIVE_PRIORITY
        }
        fn modes(&self) -> Vec<ModeName> {
            vec![ModeName::new("scoreboard_recent"), ModeName::new("scoreboard_live")]
        }
        fn display(&mut self, _mode: &ModeName, _force_clear: bool) -> DisplayOutcome {
            DisplayOutcome::Rendered
        }
        fn has_live_priority(&self) -> bool {
            true
        }
        fn has_live_content(&self) -> bool {
            self.live
        }
        fn get_live_modes(&self) -> Vec<ModeName> {
            vec![ModeName::new("scoreboard_live")]
        }
    }

    fn registry_with(live: bool) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry
            .register(PluginManifest::new("scoreboard", "Scoreboard"), Box::new(LivePlugin { live }))
            .expect("register scoreboard");
        registry
    }

    #[test]
    fn on_demand_takes_priority_over_everything() {
        let registry = registry_with(true);
        let rotation = RotationState { modes: registry.available_modes(), index: 0, ..Default::default() };
        let mut on_demand = OnDemandState::default();
        on_demand.status = crate::state::OnDemandStatus::Active;
        on_demand.plugin_id = Some("scoreboard".to_string());
        on_demand.modes = vec![ModeName::new("scoreboard_recent")];

        let decision = decide(&registry, &rotation, &on_demand, None, None);
        match decision {
            ArbiterDecision::Render { reason, .. } => assert_eq!(reason, ArbiterReason::OnDemand),
            other => panic!("expected Render(OnDemand), got {other:?}"),
        }
    }

    #[test]
    fn live_priority_preempts_rotation() {
        let registry = registry_with(true);
        let rotation = RotationState { modes: registry.available_modes(), index: 0, ..Default::default() };
        let on_demand = OnDemandState::default();
        let decision = decide(&registry, &rotation, &on_demand, None, None);
        match decision {
            ArbiterDecision::Render { mode, reason, .. } => {
                assert_eq!(reason, ArbiterReason::LivePriority);
                assert_eq!(mode.as_str(), "scoreboard_live");
            }
            other => panic!("expected live priority render, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_rotation_without_live_content() {
        let registry = registry_with(false);
        let rotation = RotationState { modes: registry.available_modes(), index: 0, ..Default::default() };
        let on_demand = OnDemandState::default();
        let decision = decide(&registry, &rotation, &on_demand, None, None);
        match decision {
            ArbiterDecision::Render { mode, reason, .. } => {
                assert_eq!(reason, ArbiterReason::Rotation);
                assert_eq!(mode.as_str(), "scoreboard_recent");
            }
            other => panic!("expected rotation render, got {other:?}"),
        }
    }

    #[test]
    fn empty_registry_yields_empty_decision() {
        let registry = PluginRegistry::new();
        let rotation = RotationState::default();
        let on_demand = OnDemandState::default();
        assert!(matches!(decide(&registry, &rotation, &on_demand, None, None), ArbiterDecision::Empty));
    }
}
