use std::collections::BTreeMap;
use std::ops::Bound;

use ksm_model::{BeatMap, Interval, Lane, Pulse};
use ksm_timing::TimingCache;

use super::hold_ticks::create_hold_tick_judgments;
use super::{JudgmentResult, JudgmentWindows, KeyBeam, KeyBeamType};

/// Judgment state of one button lane for a play session.
///
/// Built once from the lane's notes and the chart timing; mutated only by
/// the per-frame update calls. `update` and `update_hold_ticks` must be
/// given the same lane this judgment was built from.
#[derive(Debug, Clone)]
pub struct ButtonLaneJudgment {
    windows: JudgmentWindows,
    /// Time of every note start/end and every hold tick.
    pulse_to_sec: BTreeMap<Pulse, f64>,
    chip_judgments: BTreeMap<Pulse, JudgmentResult>,
    hold_judgments: BTreeMap<Pulse, JudgmentResult>,
    /// Start of the latest note known to be fully expired.
    passed_pulse: Option<Pulse>,
    /// Latest hold tick resolved (graded or expired).
    passed_tick_pulse: Option<Pulse>,
    holding_pulse: Option<Pulse>,
    score: u32,
    score_max: u32,
}

impl ButtonLaneJudgment {
    pub fn new(
        lane: &Lane,
        beat_map: &BeatMap,
        timing_cache: &TimingCache,
        windows: JudgmentWindows,
    ) -> Self {
        let chip_judgments: BTreeMap<Pulse, JudgmentResult> = lane
            .iter()
            .filter(|(_, note)| note.is_chip())
            .map(|(y, _)| (y, JudgmentResult::Unjudged))
            .collect();
        let hold_judgments = create_hold_tick_judgments(lane, beat_map);

        let mut pulse_to_sec = BTreeMap::new();
        let pulses = lane
            .iter()
            .flat_map(|(y, note)| [y, y + note.length])
            .chain(hold_judgments.keys().copied());
        for pulse in pulses {
            pulse_to_sec
                .entry(pulse)
                .or_insert_with(|| timing_cache.pulse_to_sec(pulse));
        }

        let score_max = ((chip_judgments.len() + hold_judgments.len()) * 2) as u32;
        log::debug!(
            "ButtonLaneJudgment: {} chip note(s), {} hold tick(s), score max {}",
            chip_judgments.len(),
            hold_judgments.len(),
            score_max
        );

        Self {
            windows,
            pulse_to_sec,
            chip_judgments,
            hold_judgments,
            passed_pulse: None,
            passed_tick_pulse: None,
            holding_pulse: None,
            score: 0,
            score_max,
        }
    }

    /// Per-frame update.
    ///
    /// Advances the passed cursor, then on a key-down edge grades the nearest
    /// unjudged chip note (or grabs a hold note). Returns the key beam to
    /// show, or `None` when nothing was matched.
    pub fn update(
        &mut self,
        lane: &Lane,
        current_pulse: Pulse,
        current_time_sec: f64,
        key_down: bool,
    ) -> Option<KeyBeam> {
        self.advance_passed(lane, current_time_sec);

        if let Some(holding) = self.holding_pulse {
            let still_covered = lane
                .get(holding)
                .is_some_and(|note| holding + note.length > current_pulse);
            if !still_covered {
                self.holding_pulse = None;
            }
        }

        if key_down {
            self.process_key_down(lane, current_pulse, current_time_sec)
        } else {
            None
        }
    }

    /// Grade hold ticks that have been reached.
    ///
    /// A reached tick is Critical while the key is held on the hold note
    /// containing it. A tick nobody held within the error window stays
    /// unjudged (a miss).
    pub fn update_hold_ticks(
        &mut self,
        lane: &Lane,
        current_pulse: Pulse,
        current_time_sec: f64,
        key_held: bool,
    ) {
        let lower = match self.passed_tick_pulse {
            Some(passed) if passed >= current_pulse => return,
            Some(passed) => Bound::Excluded(passed),
            None => Bound::Unbounded,
        };
        let pending: Vec<Pulse> = self
            .hold_judgments
            .range((lower, Bound::Included(current_pulse)))
            .map(|(&pulse, _)| pulse)
            .collect();

        for tick in pending {
            let owner = lane.at_or_before(tick).map(|(y, _)| y);
            let held_on_owner = key_held && owner.is_some() && self.holding_pulse == owner;

            if held_on_owner {
                self.grade_hold_tick(tick, JudgmentResult::Critical);
            } else if self.is_expired(tick, current_time_sec) {
                log::trace!("hold tick {} missed", tick);
            } else {
                break;
            }
            self.passed_tick_pulse = Some(tick);
        }
    }

    /// Drop the current hold (key released).
    pub fn release(&mut self) {
        self.holding_pulse = None;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn score_max(&self) -> u32 {
        self.score_max
    }

    pub fn passed_pulse(&self) -> Option<Pulse> {
        self.passed_pulse
    }

    pub fn holding_pulse(&self) -> Option<Pulse> {
        self.holding_pulse
    }

    pub fn chip_judgment(&self, pulse: Pulse) -> Option<JudgmentResult> {
        self.chip_judgments.get(&pulse).copied()
    }

    pub fn hold_tick_judgment(&self, pulse: Pulse) -> Option<JudgmentResult> {
        self.hold_judgments.get(&pulse).copied()
    }

    pub fn chip_judgments(&self) -> &BTreeMap<Pulse, JudgmentResult> {
        &self.chip_judgments
    }

    pub fn hold_tick_judgments(&self) -> &BTreeMap<Pulse, JudgmentResult> {
        &self.hold_judgments
    }

    /// Number of chip notes and hold ticks with the given grade.
    pub fn count(&self, result: JudgmentResult) -> usize {
        self.chip_judgments
            .values()
            .chain(self.hold_judgments.values())
            .filter(|&&r| r == result)
            .count()
    }

    fn process_key_down(
        &mut self,
        lane: &Lane,
        current_pulse: Pulse,
        current_time_sec: f64,
    ) -> Option<KeyBeam> {
        let mut passed = self.passed_pulse;
        // (pulse, distance) of the nearest unjudged chip note
        let mut nearest: Option<(Pulse, f64)> = None;

        for (y, note) in lane.after(self.passed_pulse) {
            let Some((sec, end_sec)) = self.note_secs(y, note) else {
                continue;
            };
            if current_time_sec - end_sec >= self.windows.error {
                passed = Some(y);
                continue;
            }

            let distance = (sec - current_time_sec).abs();
            let nearer = nearest.is_none_or(|(_, best)| distance < best);

            if note.is_chip() {
                if self.chip_judgments.get(&y) != Some(&JudgmentResult::Unjudged) {
                    continue;
                }
                if nearer {
                    nearest = Some((y, distance));
                } else if y > current_pulse {
                    break;
                }
            } else {
                let ahead = sec - current_time_sec;
                if nearer && ahead <= self.windows.pre_hold && y + note.length > current_pulse {
                    // Holds are graded by their ticks, not by the press
                    self.set_passed(passed);
                    self.holding_pulse = Some(y);
                    log::trace!("holding note at {}", y);
                    return None;
                } else if nearest.is_some() && ahead > self.windows.pre_hold && y > current_pulse
                {
                    break;
                }
            }
        }
        self.set_passed(passed);

        let (y, distance) = nearest?;
        let result = self.windows.classify(distance)?;
        self.grade_chip(y, result);
        KeyBeamType::from_result(result).map(|kind| KeyBeam {
            kind,
            time_sec: current_time_sec,
        })
    }

    /// Skip notes whose error window has fully elapsed. Stops at the first
    /// live note.
    fn advance_passed(&mut self, lane: &Lane, current_time_sec: f64) {
        let mut passed = self.passed_pulse;
        for (y, note) in lane.after(self.passed_pulse) {
            let Some((_, end_sec)) = self.note_secs(y, note) else {
                continue;
            };
            if current_time_sec - end_sec >= self.windows.error {
                passed = Some(y);
            } else {
                break;
            }
        }
        self.set_passed(passed);
    }

    fn set_passed(&mut self, passed: Option<Pulse>) {
        debug_assert!(
            passed >= self.passed_pulse,
            "passed cursor moved backwards: {:?} -> {:?}",
            self.passed_pulse,
            passed
        );
        self.passed_pulse = passed;
    }

    fn note_secs(&self, y: Pulse, note: &Interval) -> Option<(f64, f64)> {
        let sec = *self.pulse_to_sec.get(&y)?;
        let end_sec = *self.pulse_to_sec.get(&(y + note.length))?;
        Some((sec, end_sec))
    }

    fn is_expired(&self, pulse: Pulse, current_time_sec: f64) -> bool {
        self.pulse_to_sec
            .get(&pulse)
            .is_some_and(|&sec| current_time_sec - sec >= self.windows.error)
    }

    fn grade_chip(&mut self, y: Pulse, result: JudgmentResult) {
        if let Some(slot) = self.chip_judgments.get_mut(&y) {
            debug_assert_eq!(*slot, JudgmentResult::Unjudged, "chip note {} judged twice", y);
            *slot = result;
            self.score += result.score_value();
            debug_assert!(self.score <= self.score_max);
            log::trace!("chip note {} judged {:?}", y, result);
        }
    }

    fn grade_hold_tick(&mut self, pulse: Pulse, result: JudgmentResult) {
        if let Some(slot) = self.hold_judgments.get_mut(&pulse) {
            debug_assert_eq!(*slot, JudgmentResult::Unjudged, "hold tick {} judged twice", pulse);
            *slot = result;
            self.score += result.score_value();
            debug_assert!(self.score <= self.score_max);
        }
    }
}
