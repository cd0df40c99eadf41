//! Chart schedule model: tempo/time-signature map and per-lane notes.

pub mod beat;
pub mod chart;
pub mod error;
pub mod note;

pub use beat::{
    BeatMap, DEFAULT_BPM, DEFAULT_RESOLUTION, MIN_RESOLUTION, Pulse, RelPulse, TempoChange, TimeSig,
    TimeSigChange,
};
pub use chart::{BT_LANE_COUNT, ChartSchedule, FX_LANE_COUNT, LANE_COUNT, LaneId, LaneKind, NoteData};
pub use error::ChartError;
pub use note::{Interval, Lane, NoteEntry, NoteKind};
