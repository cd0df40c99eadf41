use std::collections::BTreeMap;

use ksm_model::{BeatMap, Lane, Pulse, RelPulse};

use super::JudgmentResult;

/// Hold notes starting at or above this tempo get half as many ticks.
pub const HALVE_COMBO_BPM_THRESHOLD: f64 = 256.0;

/// Tick spacing for a hold note starting at `pulse`.
///
/// Decided by the tempo at the note start only; tempo changes inside the
/// note are ignored.
pub fn hold_tick_interval(beat_map: &BeatMap, pulse: Pulse) -> RelPulse {
    let measure = beat_map.measure_pulses();
    if beat_map.tempo_at(pulse) >= HALVE_COMBO_BPM_THRESHOLD {
        measure / 8
    } else {
        measure / 16
    }
}

/// Unjudged grades for every hold tick of `lane`.
///
/// A hold shorter than 1.5 ticks gets a single tick at its start. Longer
/// holds get one tick per interval, starting one interval after the first
/// interval boundary at or after the note start, and stopping one interval
/// before the note end.
pub fn create_hold_tick_judgments(
    lane: &Lane,
    beat_map: &BeatMap,
) -> BTreeMap<Pulse, JudgmentResult> {
    let mut judgments = BTreeMap::new();

    // TODO: merge consecutive holds where one ends exactly where the next starts
    for (y, note) in lane.iter().filter(|(_, note)| !note.is_chip()) {
        let interval = hold_tick_interval(beat_map, y);

        if note.length * 2 < interval * 3 {
            judgments.entry(y).or_insert(JudgmentResult::Unjudged);
            continue;
        }

        let start = ((y + interval - 1).div_euclid(interval) + 1) * interval;
        let end = y + note.length - interval;
        let mut pulse = start;
        while pulse < end {
            judgments.entry(pulse).or_insert(JudgmentResult::Unjudged);
            pulse += interval;
        }
    }

    judgments
}
