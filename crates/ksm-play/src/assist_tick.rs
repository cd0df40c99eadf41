use ksm_model::{Lane, LaneId, LaneKind, NoteData, NoteKind, Pulse, LANE_COUNT};
use ksm_timing::TimingCache;
use serde::{Deserialize, Serialize};

/// Assist ticks are triggered this far ahead to make up for audio output
/// latency.
pub const ASSIST_TICK_LEAD_SEC: f64 = 0.03;

/// Request to play the assist tick sound for a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueEvent {
    pub lane: LaneId,
    pub pulse: Pulse,
    pub kind: NoteKind,
}

/// Schedules one assist tick per note, independently of judgment.
#[derive(Debug, Clone)]
pub struct AssistTick {
    enabled: bool,
    lead_sec: f64,
    played_pulses: [Option<Pulse>; LANE_COUNT],
}

impl AssistTick {
    pub fn new(enabled: bool) -> Self {
        Self::with_lead(enabled, ASSIST_TICK_LEAD_SEC)
    }

    pub fn with_lead(enabled: bool, lead_sec: f64) -> Self {
        Self {
            enabled,
            lead_sec,
            played_pulses: [None; LANE_COUNT],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn played_pulse(&self, lane: LaneId) -> Option<Pulse> {
        self.played_pulses[lane.index()]
    }

    /// Cue events due at `current_time_sec`, at most one per lane.
    pub fn update(
        &mut self,
        notes: &NoteData,
        timing_cache: &TimingCache,
        current_time_sec: f64,
    ) -> Vec<CueEvent> {
        if !self.enabled {
            return Vec::new();
        }

        let lookahead_pulse = timing_cache.sec_to_pulse(current_time_sec + self.lead_sec);
        LaneId::all()
            .iter()
            .filter_map(|&id| self.update_lane(id, notes.lane(id), lookahead_pulse))
            .collect()
    }

    /// Advance one lane to `lookahead_pulse`.
    ///
    /// FX lanes only tick on chip notes, but a hold still counts as played.
    pub fn update_lane(
        &mut self,
        id: LaneId,
        lane: &Lane,
        lookahead_pulse: Pulse,
    ) -> Option<CueEvent> {
        let (pulse, note) = lane.at_or_before(lookahead_pulse)?;
        let played = &mut self.played_pulses[id.index()];
        if played.is_some_and(|played| pulse <= played) {
            return None;
        }
        *played = Some(pulse);

        let kind = note.kind();
        match (id.kind(), kind) {
            (LaneKind::Fx, NoteKind::Hold) => None,
            (LaneKind::Bt, _) | (LaneKind::Fx, NoteKind::Chip) => {
                log::trace!("assist tick {:?} at {}", id, pulse);
                Some(CueEvent {
                    lane: id,
                    pulse,
                    kind,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksm_model::BeatMap;

    fn notes() -> NoteData {
        let mut notes = NoteData::default();
        notes.bt[0] = Lane::from_notes([(480, 0), (960, 480)]).expect("valid lane");
        notes.fx[0] = Lane::from_notes([(480, 240), (960, 0)]).expect("valid lane");
        notes
    }

    fn timing() -> TimingCache {
        TimingCache::new(&BeatMap::with_tempo(240, 120.0).expect("valid beat map"))
    }

    #[test]
    fn triggers_ahead_by_lead() {
        let notes = notes();
        let timing = timing();
        let mut tick = AssistTick::new(true);

        assert!(tick.update(&notes, &timing, 0.9).is_empty());
        let events = tick.update(&notes, &timing, 0.975);
        assert_eq!(
            events,
            vec![CueEvent {
                lane: LaneId::BtA,
                pulse: 480,
                kind: NoteKind::Chip,
            }]
        );
        // FX hold at 480 is played silently
        assert_eq!(tick.played_pulse(LaneId::FxL), Some(480));
    }

    #[test]
    fn second_update_with_same_time_is_noop() {
        let notes = notes();
        let timing = timing();
        let mut tick = AssistTick::new(true);
        assert_eq!(tick.update(&notes, &timing, 2.0).len(), 2);
        assert!(tick.update(&notes, &timing, 2.0).is_empty());
    }

    #[test]
    fn skipped_notes_trigger_only_latest() {
        let notes = notes();
        let timing = timing();
        let mut tick = AssistTick::new(true);
        let events = tick.update(&notes, &timing, 5.0);
        let bt: Vec<_> = events.iter().filter(|e| e.lane == LaneId::BtA).collect();
        assert_eq!(bt.len(), 1);
        assert_eq!(bt[0].pulse, 960);
        assert_eq!(bt[0].kind, NoteKind::Hold);
    }

    #[test]
    fn disabled_never_triggers() {
        let notes = notes();
        let timing = timing();
        let mut tick = AssistTick::new(false);
        assert!(tick.update(&notes, &timing, 5.0).is_empty());
        assert_eq!(tick.played_pulse(LaneId::BtA), None);
    }

    #[test]
    fn nothing_before_first_note() {
        let lane = Lane::from_notes([(480, 0)]).expect("valid lane");
        let mut tick = AssistTick::new(true);
        assert_eq!(tick.update_lane(LaneId::BtB, &lane, 479), None);
        assert_eq!(tick.played_pulse(LaneId::BtB), None);
    }
}
