use ksm_model::{BeatMap, Pulse};

/// Tolerance (in pulses) applied before flooring a converted pulse, so that
/// values a rounding error below an integer still map onto it.
const PULSE_EPSILON: f64 = 1e-6;

const MS_PER_MINUTE: f64 = 60_000.0;

/// One constant-tempo stretch of the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSegment {
    pub start_pulse: Pulse,
    pub start_ms: f64,
    /// `bpm * resolution`
    pulses_per_minute: f64,
}

impl TimingSegment {
    pub fn ms_per_pulse(&self) -> f64 {
        MS_PER_MINUTE / self.pulses_per_minute
    }

    fn pulse_to_ms(&self, pulse: Pulse) -> f64 {
        self.start_ms + (pulse - self.start_pulse) as f64 * MS_PER_MINUTE / self.pulses_per_minute
    }

    fn ms_to_pulse_f64(&self, ms: f64) -> f64 {
        self.start_pulse as f64 + (ms - self.start_ms) * self.pulses_per_minute / MS_PER_MINUTE
    }
}

/// Piecewise-linear pulse/time conversion table built from a [`BeatMap`].
///
/// Holds one segment per tempo change. Built once at chart load and never
/// mutated, so it can be shared by reference between every lane judgment
/// and the assist tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingCache {
    resolution: Pulse,
    segments: Vec<TimingSegment>,
}

impl TimingCache {
    pub fn new(beat_map: &BeatMap) -> Self {
        let resolution = beat_map.resolution();
        let mut segments: Vec<TimingSegment> = Vec::with_capacity(beat_map.tempo_changes().len());

        for change in beat_map.tempo_changes() {
            let start_ms = match segments.last() {
                Some(prev) => prev.pulse_to_ms(change.pulse),
                None => 0.0,
            };
            segments.push(TimingSegment {
                start_pulse: change.pulse,
                start_ms,
                pulses_per_minute: change.bpm * resolution as f64,
            });
        }

        debug_assert!(
            segments.windows(2).all(|w| w[0].start_ms <= w[1].start_ms),
            "segment start times must be non-decreasing"
        );
        log::debug!("TimingCache: {} segment(s)", segments.len());

        Self {
            resolution,
            segments,
        }
    }

    pub fn resolution(&self) -> Pulse {
        self.resolution
    }

    pub fn segments(&self) -> &[TimingSegment] {
        &self.segments
    }

    /// Time in milliseconds at `pulse`. Extrapolates linearly beyond the
    /// first and last segments.
    pub fn pulse_to_ms(&self, pulse: Pulse) -> f64 {
        let index = self
            .segments
            .partition_point(|segment| segment.start_pulse <= pulse)
            .saturating_sub(1);
        self.segments[index].pulse_to_ms(pulse)
    }

    pub fn pulse_to_sec(&self, pulse: Pulse) -> f64 {
        self.pulse_to_ms(pulse) / 1000.0
    }

    /// Fractional pulse at `ms`. Extrapolates linearly before the chart
    /// start and after the last segment.
    pub fn ms_to_pulse_f64(&self, ms: f64) -> f64 {
        let index = self
            .segments
            .partition_point(|segment| segment.start_ms <= ms)
            .saturating_sub(1);
        self.segments[index].ms_to_pulse_f64(ms)
    }

    /// Integer pulse at `ms` (the pulse whose time is at or before `ms`).
    pub fn ms_to_pulse(&self, ms: f64) -> Pulse {
        (self.ms_to_pulse_f64(ms) + PULSE_EPSILON).floor() as Pulse
    }

    pub fn sec_to_pulse(&self, sec: f64) -> Pulse {
        self.ms_to_pulse(sec * 1000.0)
    }
}

impl From<&BeatMap> for TimingCache {
    fn from(beat_map: &BeatMap) -> Self {
        Self::new(beat_map)
    }
}
