use std::collections::BTreeMap;

use ksm_model::{BeatMap, Lane, Pulse, TempoChange};
use ksm_play::judgment::{
    ButtonLaneJudgment, JudgmentResult, JudgmentWindows, KeyBeamType, create_hold_tick_judgments,
};
use ksm_timing::TimingCache;
use proptest::prelude::*;

fn setup(notes: &[(Pulse, Pulse)]) -> (Lane, BeatMap, TimingCache) {
    let lane = Lane::from_notes(notes.iter().copied()).expect("valid lane");
    let beat_map = BeatMap::with_tempo(240, 120.0).expect("valid beat map");
    let timing = TimingCache::new(&beat_map);
    (lane, beat_map, timing)
}

fn press_at(notes: &[(Pulse, Pulse)], t: f64) -> (ButtonLaneJudgment, Option<KeyBeamType>) {
    let (lane, beat_map, timing) = setup(notes);
    let mut judgment =
        ButtonLaneJudgment::new(&lane, &beat_map, &timing, JudgmentWindows::default());
    let beam = judgment.update(&lane, timing.sec_to_pulse(t), t, true);
    (judgment, beam.map(|b| b.kind))
}

#[test]
fn test_quarter_note_is_half_second() {
    let (_, _, timing) = setup(&[]);
    assert_eq!(timing.pulse_to_ms(240), 500.0);
}

#[test]
fn test_chip_press_grades() {
    let (j, beam) = press_at(&[(480, 0)], 0.995);
    assert_eq!(beam, Some(KeyBeamType::Critical));
    assert_eq!(j.score(), 2);

    let (j, beam) = press_at(&[(480, 0)], 1.04);
    assert_eq!(beam, Some(KeyBeamType::Near));
    assert_eq!(j.score(), 1);

    let (j, beam) = press_at(&[(480, 0)], 1.20);
    assert_eq!(beam, None);
    assert_eq!(j.score(), 0);
    assert_eq!(j.chip_judgment(480), Some(JudgmentResult::Unjudged));
}

#[test]
fn test_late_press_judges_error() {
    let (j, beam) = press_at(&[(480, 0)], 1.1);
    assert_eq!(beam, Some(KeyBeamType::Default));
    assert_eq!(j.chip_judgment(480), Some(JudgmentResult::Error));
    assert_eq!(j.count(JudgmentResult::Error), 1);
}

#[test]
fn test_one_measure_hold_ticks_strictly_inside() {
    let (lane, beat_map, _) = setup(&[(960, 960)]);
    let ticks = create_hold_tick_judgments(&lane, &beat_map);
    assert!(ticks.keys().all(|&p| p > 960 && p < 1920));
    assert!(ticks.keys().zip(ticks.keys().skip(1)).all(|(a, b)| b - a == 60));
    assert_eq!(ticks.len(), 14);
}

#[test]
fn test_combo_halving_boundary() {
    let lane = Lane::from_notes([(0, 960)]).expect("valid lane");
    let at = |bpm: f64| {
        let beat_map = BeatMap::with_tempo(240, bpm).expect("valid beat map");
        create_hold_tick_judgments(&lane, &beat_map).len()
    };
    assert_eq!(at(255.999), 14);
    assert_eq!(at(256.0), 6);
}

#[test]
fn test_halving_uses_tempo_at_note_start() {
    let beat_map = BeatMap::new(
        240,
        [TempoChange::new(0, 300.0), TempoChange::new(960, 120.0)],
        [],
    )
    .expect("valid beat map");
    let lane = Lane::from_notes([(0, 960), (960, 960)]).expect("valid lane");
    let ticks = create_hold_tick_judgments(&lane, &beat_map);
    assert_eq!(ticks.range(..960).count(), 6);
    assert_eq!(ticks.range(960..).count(), 14);
}

#[test]
fn test_second_press_takes_next_note() {
    let (lane, beat_map, timing) = setup(&[(480, 0), (600, 0)]);
    let mut j = ButtonLaneJudgment::new(&lane, &beat_map, &timing, JudgmentWindows::default());

    j.update(&lane, timing.sec_to_pulse(1.0), 1.0, true);
    j.update(&lane, timing.sec_to_pulse(1.01), 1.01, false);
    let beam = j.update(&lane, timing.sec_to_pulse(1.02), 1.02, true);

    // 600 is 230ms away from 1.02s; nothing left in range
    assert_eq!(beam, None);
    assert_eq!(j.chip_judgment(480), Some(JudgmentResult::Critical));
    assert_eq!(j.chip_judgment(600), Some(JudgmentResult::Unjudged));
}

#[test]
fn test_custom_windows() {
    let (lane, beat_map, timing) = setup(&[(480, 0)]);
    let windows = JudgmentWindows::builder().critical(0.05).build();
    let mut j = ButtonLaneJudgment::new(&lane, &beat_map, &timing, windows);
    let beam = j.update(&lane, timing.sec_to_pulse(1.04), 1.04, true);
    assert_eq!(beam.map(|b| b.kind), Some(KeyBeamType::Critical));
}

/// Non-overlapping lane from (gap, is_hold, hold length) triples.
fn mixed_lane_notes(shape: &[(Pulse, bool, Pulse)]) -> Vec<(Pulse, Pulse)> {
    let mut notes = Vec::with_capacity(shape.len());
    let mut end = 0;
    for &(gap, is_hold, hold_length) in shape {
        let y = end + gap;
        let length = if is_hold { hold_length } else { 0 };
        notes.push((y, length));
        end = y + length;
    }
    notes
}

fn assert_stable(
    before: &BTreeMap<Pulse, JudgmentResult>,
    after: &BTreeMap<Pulse, JudgmentResult>,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(before.len(), after.len());
    for (pulse, result) in after {
        let previous = before[pulse];
        if previous.is_judged() {
            prop_assert_eq!(previous, *result, "unit at {} regraded", pulse);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_grades_assigned_at_most_once(
        shape in prop::collection::vec((1i64..480, prop::bool::weighted(0.4), 1i64..960), 1..12),
        toggles in prop::collection::vec(0.0f64..30.0, 0..60),
    ) {
        let notes = mixed_lane_notes(&shape);
        let (lane, beat_map, timing) = setup(&notes);
        let mut j = ButtonLaneJudgment::new(&lane, &beat_map, &timing, JudgmentWindows::default());
        let unit_count = j.chip_judgments().len() + j.hold_tick_judgments().len();
        prop_assert_eq!(j.score_max() as usize, unit_count * 2);

        // Even toggles press the key, odd toggles release it
        let mut toggles = toggles;
        toggles.sort_by(f64::total_cmp);
        let mut next_toggle = 0;

        let last_end = notes.iter().map(|&(y, l)| y + l).max().unwrap_or(0);
        let end_sec = timing.pulse_to_sec(last_end) + 1.0;
        let mut chips = j.chip_judgments().clone();
        let mut ticks = j.hold_tick_judgments().clone();

        let mut frame = 0;
        loop {
            let t = frame as f64 / 120.0;
            if t > end_sec {
                break;
            }
            let mut just_pressed = false;
            while next_toggle < toggles.len() && toggles[next_toggle] <= t {
                just_pressed |= next_toggle % 2 == 0;
                next_toggle += 1;
            }
            let held = next_toggle % 2 == 1 || just_pressed;

            let pulse = timing.sec_to_pulse(t);
            j.update(&lane, pulse, t, just_pressed);
            j.update_hold_ticks(&lane, pulse, t, held);
            if !held {
                j.release();
            }

            assert_stable(&chips, j.chip_judgments())?;
            assert_stable(&ticks, j.hold_tick_judgments())?;
            let graded: u32 = j
                .chip_judgments()
                .values()
                .chain(j.hold_tick_judgments().values())
                .map(|r| r.score_value())
                .sum();
            prop_assert_eq!(j.score(), graded);
            prop_assert!(j.score() <= j.score_max());

            chips = j.chip_judgments().clone();
            ticks = j.hold_tick_judgments().clone();
            frame += 1;
        }
    }

    #[test]
    fn prop_passed_cursor_is_monotonic(
        pulses in prop::collection::btree_set(0i64..4800, 1..20),
    ) {
        let notes: Vec<(Pulse, Pulse)> = pulses.iter().map(|&p| (p, 0)).collect();
        let (lane, beat_map, timing) = setup(&notes);
        let mut j = ButtonLaneJudgment::new(&lane, &beat_map, &timing, JudgmentWindows::default());

        let mut last = None;
        for frame in 0..1500 {
            let t = frame as f64 / 120.0;
            j.update(&lane, timing.sec_to_pulse(t), t, frame % 7 == 0);
            prop_assert!(j.passed_pulse() >= last);
            last = j.passed_pulse();
        }
        // 12.5s covers every note's error window
        prop_assert_eq!(last, pulses.iter().next_back().copied());
    }
}
