use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::beat::{Pulse, RelPulse};
use crate::error::ChartError;

/// Length of a note starting at its map key. Zero length is a chip note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Interval {
    #[serde(rename = "l", default)]
    pub length: RelPulse,
}

impl Interval {
    pub const CHIP: Interval = Interval { length: 0 };

    pub fn hold(length: RelPulse) -> Self {
        Self { length }
    }

    pub fn is_chip(&self) -> bool {
        self.length == 0
    }

    pub fn kind(&self) -> NoteKind {
        if self.is_chip() {
            NoteKind::Chip
        } else {
            NoteKind::Hold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    Chip,
    Hold,
}

/// A note as written in the serialized chart schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub y: Pulse,
    #[serde(default)]
    pub l: RelPulse,
}

/// Ordered notes of one playable lane, keyed by start pulse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NoteEntry>", into = "Vec<NoteEntry>")]
pub struct Lane {
    notes: BTreeMap<Pulse, Interval>,
}

impl Lane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lane from `(pulse, length)` pairs.
    pub fn from_notes(
        notes: impl IntoIterator<Item = (Pulse, RelPulse)>,
    ) -> Result<Self, ChartError> {
        let mut lane = Self::new();
        for (pulse, length) in notes {
            lane.insert(pulse, length)?;
        }
        Ok(lane)
    }

    /// Insert a note. A note already at `pulse` is replaced.
    pub fn insert(&mut self, pulse: Pulse, length: RelPulse) -> Result<(), ChartError> {
        if length < 0 {
            return Err(ChartError::NegativeLength { pulse, length });
        }
        self.notes.insert(pulse, Interval { length });
        Ok(())
    }

    pub fn get(&self, pulse: Pulse) -> Option<&Interval> {
        self.notes.get(&pulse)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Pulse, &Interval)> + '_ {
        self.notes.iter().map(|(&y, note)| (y, note))
    }

    /// Notes strictly after `pulse`, or every note when `pulse` is `None`.
    pub fn after(
        &self,
        pulse: Option<Pulse>,
    ) -> impl DoubleEndedIterator<Item = (Pulse, &Interval)> + '_ {
        let lower = match pulse {
            Some(y) => Bound::Excluded(y),
            None => Bound::Unbounded,
        };
        self.notes
            .range((lower, Bound::Unbounded))
            .map(|(&y, note)| (y, note))
    }

    /// Latest note starting at or before `pulse`.
    pub fn at_or_before(&self, pulse: Pulse) -> Option<(Pulse, &Interval)> {
        self.notes
            .range(..=pulse)
            .next_back()
            .map(|(&y, note)| (y, note))
    }

    pub fn chip_count(&self) -> usize {
        self.notes.values().filter(|note| note.is_chip()).count()
    }
}

impl TryFrom<Vec<NoteEntry>> for Lane {
    type Error = ChartError;

    fn try_from(entries: Vec<NoteEntry>) -> Result<Self, Self::Error> {
        Self::from_notes(entries.into_iter().map(|entry| (entry.y, entry.l)))
    }
}

impl From<Lane> for Vec<NoteEntry> {
    fn from(lane: Lane) -> Self {
        lane.notes
            .into_iter()
            .map(|(y, note)| NoteEntry { y, l: note.length })
            .collect()
    }
}
