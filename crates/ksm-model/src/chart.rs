use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::beat::{BeatMap, Pulse};
use crate::error::ChartError;
use crate::note::Lane;

/// Number of BT (button) lanes.
pub const BT_LANE_COUNT: usize = 4;

/// Number of FX (effect) lanes.
pub const FX_LANE_COUNT: usize = 2;

/// Total number of playable lanes.
pub const LANE_COUNT: usize = BT_LANE_COUNT + FX_LANE_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneKind {
    Bt,
    Fx,
}

/// A playable lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneId {
    BtA,
    BtB,
    BtC,
    BtD,
    FxL,
    FxR,
}

impl LaneId {
    /// Returns all lanes in order (BT A-D, then FX L/R).
    pub fn all() -> &'static [LaneId] {
        &[
            LaneId::BtA,
            LaneId::BtB,
            LaneId::BtC,
            LaneId::BtD,
            LaneId::FxL,
            LaneId::FxR,
        ]
    }

    pub fn kind(self) -> LaneKind {
        match self {
            LaneId::BtA | LaneId::BtB | LaneId::BtC | LaneId::BtD => LaneKind::Bt,
            LaneId::FxL | LaneId::FxR => LaneKind::Fx,
        }
    }

    /// Index within [`LaneId::all`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Index within the lane's own kind (BT 0..4, FX 0..2).
    pub fn kind_index(self) -> usize {
        match self {
            LaneId::BtA => 0,
            LaneId::BtB => 1,
            LaneId::BtC => 2,
            LaneId::BtD => 3,
            LaneId::FxL => 0,
            LaneId::FxR => 1,
        }
    }
}

/// Notes of every playable lane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    #[serde(default)]
    pub bt: [Lane; BT_LANE_COUNT],
    #[serde(default)]
    pub fx: [Lane; FX_LANE_COUNT],
}

impl NoteData {
    pub fn lane(&self, id: LaneId) -> &Lane {
        match id.kind() {
            LaneKind::Bt => &self.bt[id.kind_index()],
            LaneKind::Fx => &self.fx[id.kind_index()],
        }
    }

    pub fn lane_mut(&mut self, id: LaneId) -> &mut Lane {
        match id.kind() {
            LaneKind::Bt => &mut self.bt[id.kind_index()],
            LaneKind::Fx => &mut self.fx[id.kind_index()],
        }
    }
}

/// Timing-relevant part of a loaded chart: the beat map plus every lane's
/// note schedule. Produced by a chart loader; already validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSchedule {
    #[serde(default)]
    pub beat: BeatMap,
    #[serde(default)]
    pub note: NoteData,
}

impl ChartSchedule {
    pub fn new(beat: BeatMap) -> Self {
        Self {
            beat,
            note: NoteData::default(),
        }
    }

    pub fn lane(&self, id: LaneId) -> &Lane {
        self.note.lane(id)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schedule from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChartError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ChartError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let schedule = Self::from_json_str(&content)?;
        log::info!(
            "Loaded chart schedule {} ({} notes)",
            path.display(),
            schedule.note_count()
        );
        Ok(schedule)
    }

    pub fn note_count(&self) -> usize {
        LaneId::all().iter().map(|&id| self.lane(id).len()).sum()
    }

    /// Pulse at which the last note ends, or `None` for an empty chart.
    pub fn last_note_end(&self) -> Option<Pulse> {
        LaneId::all()
            .iter()
            .filter_map(|&id| {
                self.lane(id)
                    .iter()
                    .map(|(y, note)| y + note.length)
                    .max()
            })
            .max()
    }
}
