use anyhow::{Context, Result};
use ksm_model::{BeatMap, ChartSchedule, LANE_COUNT, LaneId, NoteData, Pulse};
use ksm_timing::TimingCache;
use serde::{Deserialize, Serialize};

use crate::assist_tick::{AssistTick, CueEvent};
use crate::config::PlayConfig;
use crate::input::InputSnapshot;
use crate::judgment::{ButtonLaneJudgment, JudgmentResult, KeyBeam};

/// Score shown to the player when every unit is Critical.
pub const DISPLAY_SCORE_MAX: u64 = 10_000_000;

/// Everything a frame produced, for the renderer and audio layers.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvents {
    pub current_pulse: Pulse,
    /// Chart time after the global offset is applied.
    pub current_time_sec: f64,
    pub key_beams: [Option<KeyBeam>; LANE_COUNT],
    pub cues: Vec<CueEvent>,
}

impl FrameEvents {
    pub fn key_beam(&self, lane: LaneId) -> Option<KeyBeam> {
        self.key_beams[lane.index()]
    }
}

/// Grade counts and score of a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayResult {
    pub critical: usize,
    pub near: usize,
    pub error: usize,
    /// Units left unjudged. Only all misses once the chart has ended.
    pub unjudged: usize,
    pub score: u32,
    pub score_max: u32,
    pub display_score: u64,
}

/// Drives the judgment of every lane and the assist tick for one play.
#[derive(Debug, Clone)]
pub struct PlaySession {
    beat: BeatMap,
    notes: NoteData,
    timing_cache: TimingCache,
    lanes: [ButtonLaneJudgment; LANE_COUNT],
    assist_tick: AssistTick,
    offset_sec: f64,
}

impl PlaySession {
    pub fn new(schedule: &ChartSchedule, config: &PlayConfig) -> Result<Self> {
        config
            .windows
            .validate()
            .context("invalid play config")?;

        let timing_cache = TimingCache::new(&schedule.beat);
        let lanes = std::array::from_fn(|i| {
            let id = LaneId::all()[i];
            ButtonLaneJudgment::new(
                schedule.lane(id),
                &schedule.beat,
                &timing_cache,
                config.windows,
            )
        });
        let assist_tick = AssistTick::with_lead(config.assist_tick, config.assist_tick_lead_sec);

        let session = Self {
            beat: schedule.beat.clone(),
            notes: schedule.note.clone(),
            timing_cache,
            lanes,
            assist_tick,
            offset_sec: config.offset_sec(),
        };
        log::debug!(
            "PlaySession: {} note(s), score max {}, offset {}s",
            schedule.note_count(),
            session.score_max(),
            session.offset_sec
        );
        Ok(session)
    }

    /// Advance to `current_time_sec` (audio clock) with this frame's input.
    pub fn update(&mut self, current_time_sec: f64, input: &InputSnapshot) -> FrameEvents {
        let t = current_time_sec - self.offset_sec;
        let current_pulse = self.timing_cache.sec_to_pulse(t);

        let mut key_beams = [None; LANE_COUNT];
        for &id in LaneId::all() {
            let lane = self.notes.lane(id);
            let state = input.lane(id);
            let held = state.pressed || state.just_pressed;
            let judgment = &mut self.lanes[id.index()];

            key_beams[id.index()] = judgment.update(lane, current_pulse, t, state.just_pressed);
            judgment.update_hold_ticks(lane, current_pulse, t, held);
            if !held {
                judgment.release();
            }
        }

        let cues = self.assist_tick.update(&self.notes, &self.timing_cache, t);

        FrameEvents {
            current_pulse,
            current_time_sec: t,
            key_beams,
            cues,
        }
    }

    pub fn score(&self) -> u32 {
        self.lanes.iter().map(ButtonLaneJudgment::score).sum()
    }

    pub fn score_max(&self) -> u32 {
        self.lanes.iter().map(ButtonLaneJudgment::score_max).sum()
    }

    /// Score scaled to [`DISPLAY_SCORE_MAX`], rounded down.
    pub fn display_score(&self) -> u64 {
        display_score(self.score(), self.score_max())
    }

    pub fn count(&self, result: JudgmentResult) -> usize {
        self.lanes.iter().map(|lane| lane.count(result)).sum()
    }

    pub fn result(&self) -> PlayResult {
        PlayResult {
            critical: self.count(JudgmentResult::Critical),
            near: self.count(JudgmentResult::Near),
            error: self.count(JudgmentResult::Error),
            unjudged: self.count(JudgmentResult::Unjudged),
            score: self.score(),
            score_max: self.score_max(),
            display_score: self.display_score(),
        }
    }

    pub fn lane_judgment(&self, lane: LaneId) -> &ButtonLaneJudgment {
        &self.lanes[lane.index()]
    }

    pub fn timing_cache(&self) -> &TimingCache {
        &self.timing_cache
    }

    pub fn beat_map(&self) -> &BeatMap {
        &self.beat
    }

    pub fn assist_tick(&self) -> &AssistTick {
        &self.assist_tick
    }
}

pub fn display_score(score: u32, score_max: u32) -> u64 {
    if score_max == 0 {
        return 0;
    }
    DISPLAY_SCORE_MAX * u64::from(score) / u64::from(score_max)
}
