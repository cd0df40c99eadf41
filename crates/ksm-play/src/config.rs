use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assist_tick::ASSIST_TICK_LEAD_SEC;
use crate::judgment::JudgmentWindows;

/// Play session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayConfig {
    /// Judgment timing windows.
    #[serde(default)]
    pub windows: JudgmentWindows,
    /// Play a tick sound for every note.
    #[serde(default)]
    pub assist_tick: bool,
    /// How far ahead of a note the assist tick is triggered, in seconds.
    #[serde(default = "default_assist_tick_lead_sec")]
    pub assist_tick_lead_sec: f64,
    /// Audio/input offset in milliseconds (positive = judge later).
    #[serde(default)]
    pub global_offset_ms: i32,
}

fn default_assist_tick_lead_sec() -> f64 {
    ASSIST_TICK_LEAD_SEC
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            windows: JudgmentWindows::default(),
            assist_tick: false,
            assist_tick_lead_sec: default_assist_tick_lead_sec(),
            global_offset_ms: 0,
        }
    }
}

impl PlayConfig {
    /// Loads config from a JSON file.
    /// Returns default config if the file doesn't exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using default play config", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.windows.validate()?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Offset subtracted from the audio clock before judging.
    pub fn offset_sec(&self) -> f64 {
        f64::from(self.global_offset_ms) / 1000.0
    }
}
