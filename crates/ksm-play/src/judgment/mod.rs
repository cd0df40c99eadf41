//! Per-lane press judgment.

mod button_lane;
mod hold_ticks;
mod window;

use serde::{Deserialize, Serialize};

pub use button_lane::ButtonLaneJudgment;
pub use hold_ticks::{HALVE_COMBO_BPM_THRESHOLD, create_hold_tick_judgments, hold_tick_interval};
pub use window::{
    JudgmentWindows, JudgmentWindowsBuilder, WINDOW_SEC_CRITICAL, WINDOW_SEC_ERROR,
    WINDOW_SEC_NEAR, WINDOW_SEC_PRE_HOLD,
};

/// Grade of a judgeable unit (chip note or hold tick).
///
/// A unit leaves `Unjudged` at most once. A unit whose window expired while
/// still `Unjudged` is a miss; the grade itself does not record that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JudgmentResult {
    #[default]
    Unjudged,
    Critical,
    Near,
    Error,
}

impl JudgmentResult {
    /// Score contribution of this grade.
    pub fn score_value(self) -> u32 {
        match self {
            Self::Critical => 2,
            Self::Near => 1,
            Self::Unjudged | Self::Error => 0,
        }
    }

    pub fn is_judged(self) -> bool {
        self != Self::Unjudged
    }
}

/// Lane flash shown by the renderer after a judged press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyBeamType {
    /// Error grade
    Default,
    Near,
    Critical,
}

impl KeyBeamType {
    pub fn from_result(result: JudgmentResult) -> Option<Self> {
        match result {
            JudgmentResult::Critical => Some(Self::Critical),
            JudgmentResult::Near => Some(Self::Near),
            JudgmentResult::Error => Some(Self::Default),
            JudgmentResult::Unjudged => None,
        }
    }
}

/// Feedback event for a judged press.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyBeam {
    pub kind: KeyBeamType,
    pub time_sec: f64,
}
