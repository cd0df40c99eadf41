//! Recorded key input for deterministic re-simulation.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ksm_model::{ChartSchedule, LaneId};
use ksm_timing::TimingCache;
use serde::{Deserialize, Serialize};

use crate::input::{Button, InputSnapshot};

/// Autoplay holds a chip note's button down this long.
pub const AUTOPLAY_PRESS_DURATION_SEC: f64 = 0.05;

/// A button edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Audio clock time in seconds.
    pub time_sec: f64,
    pub button: Button,
    /// true = pressed, false = released.
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(time_sec: f64, button: Button) -> Self {
        Self {
            time_sec,
            button,
            pressed: true,
        }
    }

    pub fn release(time_sec: f64, button: Button) -> Self {
        Self {
            time_sec,
            button,
            pressed: false,
        }
    }
}

/// Key events of one play, ordered by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    #[serde(default)]
    pub events: Vec<KeyEvent>,
}

impl ReplayLog {
    /// Build a log from unordered events. Releases sort before presses at
    /// the same time.
    pub fn from_events(mut events: Vec<KeyEvent>) -> Self {
        events.sort_by(compare_events);
        Self { events }
    }

    /// Record an event. Must not be earlier than the last recorded one.
    pub fn push(&mut self, event: KeyEvent) {
        debug_assert!(
            self.events
                .last()
                .is_none_or(|last| last.time_sec <= event.time_sec),
            "replay events out of order"
        );
        self.events.push(event);
    }

    /// A perfect play of `schedule`: every note pressed on time, holds
    /// kept down until their end.
    pub fn autoplay(schedule: &ChartSchedule, offset_sec: f64) -> Self {
        let timing_cache = TimingCache::new(&schedule.beat);
        let mut events = Vec::new();

        for &id in LaneId::all() {
            let button = Button::from(id);
            let notes: Vec<_> = schedule.lane(id).iter().collect();
            for (i, &(y, note)) in notes.iter().enumerate() {
                let press_sec = timing_cache.pulse_to_sec(y) + offset_sec;
                let mut release_sec = if note.is_chip() {
                    press_sec + AUTOPLAY_PRESS_DURATION_SEC
                } else {
                    timing_cache.pulse_to_sec(y + note.length) + offset_sec
                };
                if let Some(&(next_y, _)) = notes.get(i + 1) {
                    release_sec = release_sec.min(timing_cache.pulse_to_sec(next_y) + offset_sec);
                }
                events.push(KeyEvent::press(press_sec, button));
                events.push(KeyEvent::release(release_sec, button));
            }
        }

        Self::from_events(events)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read replay {}", path.display()))?;
        let log: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse replay {}", path.display()))?;
        log::info!("Loaded replay {} ({} events)", path.display(), log.events.len());
        Ok(Self::from_events(log.events))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Time of the last event, or 0 for an empty log.
    pub fn duration_sec(&self) -> f64 {
        self.events.last().map_or(0.0, |event| event.time_sec)
    }
}

fn compare_events(a: &KeyEvent, b: &KeyEvent) -> Ordering {
    a.time_sec
        .total_cmp(&b.time_sec)
        .then(a.pressed.cmp(&b.pressed))
        .then(a.button.cmp(&b.button))
}

/// Replays a [`ReplayLog`] as per-frame input snapshots.
#[derive(Debug, Clone)]
pub struct ReplayPlayer<'a> {
    events: &'a [KeyEvent],
    current_index: usize,
    snapshot: InputSnapshot,
}

impl<'a> ReplayPlayer<'a> {
    pub fn new(log: &'a ReplayLog) -> Self {
        Self {
            events: &log.events,
            current_index: 0,
            snapshot: InputSnapshot::new(),
        }
    }

    /// Snapshot for the frame at `time_sec`, applying every event up to and
    /// including that time. Frame times must not decrease.
    pub fn advance(&mut self, time_sec: f64) -> InputSnapshot {
        self.snapshot.reset_frame_state();

        while let Some(event) = self.events.get(self.current_index) {
            if event.time_sec > time_sec {
                break;
            }
            let state = self.snapshot.button_mut(event.button);
            if event.pressed {
                state.on_press();
            } else {
                state.on_release();
            }
            self.current_index += 1;
        }

        self.snapshot
    }

    /// Whether all events have been replayed.
    pub fn is_finished(&self) -> bool {
        self.current_index >= self.events.len()
    }
}
