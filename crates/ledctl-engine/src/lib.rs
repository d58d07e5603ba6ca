//! The display engine: schedule evaluation, health tracking, arbitration,
//! and the run loop that ties them together around a plugin registry.

mod arbiter;
mod config;
mod executor;
mod request_channel;
mod run_loop;
mod schedule;
mod state;
mod ticker;
mod wifi_banner;

pub use arbiter::{decide, ArbiterDecision, ArbiterReason};
pub use config::{DisplaySettings, EngineConfig};
pub use executor::{PluginExecutor, DEFAULT_DISPLAY_TIMEOUT, DEFAULT_UPDATE_TIMEOUT};
pub use request_channel::{InMemoryRequestChannel, RequestChannel, RequestChannelExt};
pub use run_loop::{RunLoop, TickOutcome};
pub use schedule::{
    evaluate, DayWindow, DimScheduleConfig, ScheduleConfig, ScheduleDecision, ScheduleMode, ScheduleSettings,
};
pub use state::{BrightnessState, OnDemandState, OnDemandStatus, RotationState, WifiBannerRecord, WifiBannerState};
pub use ticker::{run_compositor_pass, TickerConfig, TickerFrame, TickerSource};
pub use wifi_banner::{cleanup_if_expired, read_banner};
