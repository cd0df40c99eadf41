use std::path::PathBuf;
use thiserror::Error;

use crate::beat::Pulse;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Failed to read chart schedule: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse chart schedule: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(Pulse),

    #[error("Invalid tempo {bpm} at pulse {pulse}")]
    InvalidTempo { pulse: Pulse, bpm: f64 },

    #[error("Invalid time signature {numerator}/{denominator} at pulse {pulse}")]
    InvalidTimeSig {
        pulse: Pulse,
        numerator: i64,
        denominator: i64,
    },

    #[error("Negative note length {length} at pulse {pulse}")]
    NegativeLength { pulse: Pulse, length: Pulse },
}
