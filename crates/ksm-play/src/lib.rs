//! Frame-driven play core: lane judgment, assist tick, input and replay.

pub mod assist_tick;
pub mod config;
pub mod input;
pub mod judgment;
pub mod replay;
pub mod session;

pub use assist_tick::{ASSIST_TICK_LEAD_SEC, AssistTick, CueEvent};
pub use config::PlayConfig;
pub use input::{
    Button, ButtonState, ConfigSet, DeviceInput, DeviceType, InputSnapshot, KeyConfig, RawInput,
};
pub use judgment::{ButtonLaneJudgment, JudgmentResult, JudgmentWindows, KeyBeam, KeyBeamType};
pub use replay::{KeyEvent, ReplayLog, ReplayPlayer};
pub use session::{DISPLAY_SCORE_MAX, FrameEvents, PlayResult, PlaySession};
