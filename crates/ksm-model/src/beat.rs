use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// Chart-relative musical position. 0 is the chart start.
pub type Pulse = i64;

/// Pulse distance (note length, tick spacing).
pub type RelPulse = i64;

/// Pulses per quarter note used when a chart does not specify one.
pub const DEFAULT_RESOLUTION: Pulse = 240;

/// Smallest resolution whose sixteenth note is at least one pulse.
pub const MIN_RESOLUTION: Pulse = 4;

/// Tempo assumed when a chart has no tempo change at all.
pub const DEFAULT_BPM: f64 = 120.0;

/// A tempo change at a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    #[serde(rename = "y")]
    pub pulse: Pulse,
    #[serde(rename = "v")]
    pub bpm: f64,
}

impl TempoChange {
    pub fn new(pulse: Pulse, bpm: f64) -> Self {
        Self { pulse, bpm }
    }
}

/// Time signature (numerator/denominator). Defaults to 4/4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    #[serde(rename = "n")]
    pub numerator: i64,
    #[serde(rename = "d")]
    pub denominator: i64,
}

impl Default for TimeSig {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSig {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Length of one measure in pulses for the given resolution.
    pub fn measure_pulses(&self, resolution: Pulse) -> RelPulse {
        resolution * 4 * self.numerator / self.denominator
    }
}

/// A time signature change at a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSigChange {
    #[serde(rename = "y")]
    pub pulse: Pulse,
    #[serde(flatten)]
    pub time_sig: TimeSig,
}

impl TimeSigChange {
    pub fn new(pulse: Pulse, numerator: i64, denominator: i64) -> Self {
        Self {
            pulse,
            time_sig: TimeSig::new(numerator, denominator),
        }
    }
}

/// Serialized form of a [`BeatMap`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatMapData {
    #[serde(default = "default_resolution")]
    pub resolution: Pulse,
    #[serde(default)]
    pub bpm: Vec<TempoChange>,
    #[serde(default)]
    pub time_sig: Vec<TimeSigChange>,
}

fn default_resolution() -> Pulse {
    DEFAULT_RESOLUTION
}

/// Tempo and time signature schedule of a chart.
///
/// Validated on construction and immutable afterwards. A tempo and a time
/// signature are always defined at pulse 0: if the chart omits them the
/// defaults are used, and if the first change comes later its value is
/// moved to pulse 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BeatMapData", into = "BeatMapData")]
pub struct BeatMap {
    resolution: Pulse,
    bpm_changes: BTreeMap<Pulse, f64>,
    time_sig_changes: BTreeMap<Pulse, TimeSig>,
}

impl BeatMap {
    pub fn new(
        resolution: Pulse,
        tempo_changes: impl IntoIterator<Item = TempoChange>,
        time_sig_changes: impl IntoIterator<Item = TimeSigChange>,
    ) -> Result<Self, ChartError> {
        if resolution < MIN_RESOLUTION {
            return Err(ChartError::InvalidResolution(resolution));
        }

        let mut bpm_changes = BTreeMap::new();
        for change in tempo_changes {
            if !change.bpm.is_finite() || change.bpm <= 0.0 {
                return Err(ChartError::InvalidTempo {
                    pulse: change.pulse,
                    bpm: change.bpm,
                });
            }
            // Later entries at the same pulse overwrite earlier ones
            bpm_changes.insert(change.pulse, change.bpm);
        }
        Self::anchor_at_zero(&mut bpm_changes, DEFAULT_BPM);

        let mut time_sigs = BTreeMap::new();
        for change in time_sig_changes {
            let TimeSig {
                numerator,
                denominator,
            } = change.time_sig;
            if numerator <= 0 || denominator <= 0 || change.time_sig.measure_pulses(resolution) <= 0
            {
                return Err(ChartError::InvalidTimeSig {
                    pulse: change.pulse,
                    numerator,
                    denominator,
                });
            }
            time_sigs.insert(change.pulse, change.time_sig);
        }
        Self::anchor_at_zero(&mut time_sigs, TimeSig::default());

        log::debug!(
            "BeatMap: resolution={}, {} tempo change(s), {} time signature change(s)",
            resolution,
            bpm_changes.len(),
            time_sigs.len()
        );

        Ok(Self {
            resolution,
            bpm_changes,
            time_sig_changes: time_sigs,
        })
    }

    /// Constant-tempo 4/4 schedule.
    pub fn with_tempo(resolution: Pulse, bpm: f64) -> Result<Self, ChartError> {
        Self::new(resolution, [TempoChange::new(0, bpm)], [])
    }

    fn anchor_at_zero<T: Copy>(changes: &mut BTreeMap<Pulse, T>, default: T) {
        match changes.first_key_value() {
            None => {
                changes.insert(0, default);
            }
            Some((&first, &value)) if first > 0 => {
                changes.remove(&first);
                changes.insert(0, value);
            }
            Some(_) => {}
        }
    }

    pub fn resolution(&self) -> Pulse {
        self.resolution
    }

    /// Pulses in one 4/4 measure (`resolution * 4`).
    pub fn measure_pulses(&self) -> RelPulse {
        self.resolution * 4
    }

    /// Tempo at `pulse`: the latest change at or before it, or the first
    /// change for pulses before the chart start.
    pub fn tempo_at(&self, pulse: Pulse) -> f64 {
        Self::entry_at(&self.bpm_changes, pulse).1
    }

    /// Time signature at `pulse`, with the same lookup rule as [`Self::tempo_at`].
    pub fn time_sig_at(&self, pulse: Pulse) -> TimeSig {
        Self::entry_at(&self.time_sig_changes, pulse).1
    }

    /// Pulse at which the measure containing `pulse` starts.
    ///
    /// Each time signature change starts a new measure; measures repeat with
    /// the signature's length until the next change.
    pub fn measure_start_at(&self, pulse: Pulse) -> Pulse {
        let (origin, time_sig) = Self::entry_at(&self.time_sig_changes, pulse);
        let length = time_sig.measure_pulses(self.resolution);
        origin + (pulse - origin).div_euclid(length) * length
    }

    /// Tempo changes in pulse order.
    pub fn tempo_changes(&self) -> impl ExactSizeIterator<Item = TempoChange> + '_ {
        self.bpm_changes
            .iter()
            .map(|(&pulse, &bpm)| TempoChange::new(pulse, bpm))
    }

    /// Time signature changes in pulse order.
    pub fn time_sig_changes(&self) -> impl ExactSizeIterator<Item = TimeSigChange> + '_ {
        self.time_sig_changes
            .iter()
            .map(|(&pulse, &time_sig)| TimeSigChange { pulse, time_sig })
    }

    fn entry_at<T: Copy>(changes: &BTreeMap<Pulse, T>, pulse: Pulse) -> (Pulse, T) {
        changes
            .range(..=pulse)
            .next_back()
            .or_else(|| changes.first_key_value())
            .map(|(&y, &value)| (y, value))
            .expect("BeatMap always holds an entry at pulse 0")
    }
}

impl Default for BeatMap {
    fn default() -> Self {
        let mut bpm_changes = BTreeMap::new();
        bpm_changes.insert(0, DEFAULT_BPM);
        let mut time_sig_changes = BTreeMap::new();
        time_sig_changes.insert(0, TimeSig::default());
        Self {
            resolution: DEFAULT_RESOLUTION,
            bpm_changes,
            time_sig_changes,
        }
    }
}

impl TryFrom<BeatMapData> for BeatMap {
    type Error = ChartError;

    fn try_from(data: BeatMapData) -> Result<Self, Self::Error> {
        Self::new(data.resolution, data.bpm, data.time_sig)
    }
}

impl From<BeatMap> for BeatMapData {
    fn from(beat_map: BeatMap) -> Self {
        Self {
            resolution: beat_map.resolution,
            bpm: beat_map.tempo_changes().collect(),
            time_sig: beat_map.time_sig_changes().collect(),
        }
    }
}
