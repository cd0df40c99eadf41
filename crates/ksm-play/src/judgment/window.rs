use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use super::JudgmentResult;

pub const WINDOW_SEC_CRITICAL: f64 = 0.033;
pub const WINDOW_SEC_NEAR: f64 = 0.066;
pub const WINDOW_SEC_ERROR: f64 = 0.150;

/// How far ahead of a hold note's start a press still grabs it.
pub const WINDOW_SEC_PRE_HOLD: f64 = 0.083;

/// Chip note timing windows in seconds, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentWindows {
    #[serde(default = "default_critical")]
    pub critical: f64,
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_error")]
    pub error: f64,
    #[serde(default = "default_pre_hold")]
    pub pre_hold: f64,
}

fn default_critical() -> f64 {
    WINDOW_SEC_CRITICAL
}

fn default_near() -> f64 {
    WINDOW_SEC_NEAR
}

fn default_error() -> f64 {
    WINDOW_SEC_ERROR
}

fn default_pre_hold() -> f64 {
    WINDOW_SEC_PRE_HOLD
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self {
            critical: WINDOW_SEC_CRITICAL,
            near: WINDOW_SEC_NEAR,
            error: WINDOW_SEC_ERROR,
            pre_hold: WINDOW_SEC_PRE_HOLD,
        }
    }
}

impl JudgmentWindows {
    pub fn builder() -> JudgmentWindowsBuilder {
        JudgmentWindowsBuilder::default()
    }

    /// Grade a press `distance_sec` away from the note (absolute value).
    /// Returns `None` outside the error window.
    pub fn classify(&self, distance_sec: f64) -> Option<JudgmentResult> {
        let distance = distance_sec.abs();
        if distance < self.critical {
            Some(JudgmentResult::Critical)
        } else if distance < self.near {
            Some(JudgmentResult::Near)
        } else if distance < self.error {
            Some(JudgmentResult::Error)
        } else {
            None
        }
    }

    /// Windows must be positive and nested.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.critical > 0.0 && self.critical <= self.near && self.near <= self.error,
            "judgment windows must satisfy 0 < critical <= near <= error (got {} / {} / {})",
            self.critical,
            self.near,
            self.error
        );
        ensure!(
            self.pre_hold >= 0.0,
            "pre-hold window must not be negative (got {})",
            self.pre_hold
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct JudgmentWindowsBuilder {
    critical: Option<f64>,
    near: Option<f64>,
    error: Option<f64>,
    pre_hold: Option<f64>,
}

impl JudgmentWindowsBuilder {
    pub fn critical(mut self, sec: f64) -> Self {
        self.critical = Some(sec);
        self
    }

    pub fn near(mut self, sec: f64) -> Self {
        self.near = Some(sec);
        self
    }

    pub fn error(mut self, sec: f64) -> Self {
        self.error = Some(sec);
        self
    }

    pub fn pre_hold(mut self, sec: f64) -> Self {
        self.pre_hold = Some(sec);
        self
    }

    pub fn build(self) -> JudgmentWindows {
        let default = JudgmentWindows::default();
        JudgmentWindows {
            critical: self.critical.unwrap_or(default.critical),
            near: self.near.unwrap_or(default.near),
            error: self.error.unwrap_or(default.error),
            pre_hold: self.pre_hold.unwrap_or(default.pre_hold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_nested_windows() {
        let windows = JudgmentWindows::default();
        assert_eq!(windows.classify(0.0), Some(JudgmentResult::Critical));
        assert_eq!(windows.classify(0.005), Some(JudgmentResult::Critical));
        assert_eq!(windows.classify(-0.032), Some(JudgmentResult::Critical));
        assert_eq!(windows.classify(0.040), Some(JudgmentResult::Near));
        assert_eq!(windows.classify(0.100), Some(JudgmentResult::Error));
        assert_eq!(windows.classify(0.200), None);
    }

    #[test]
    fn test_window_edges_are_exclusive() {
        let windows = JudgmentWindows::builder()
            .critical(0.5)
            .near(1.0)
            .error(2.0)
            .build();
        assert_eq!(windows.classify(0.5), Some(JudgmentResult::Near));
        assert_eq!(windows.classify(1.0), Some(JudgmentResult::Error));
        assert_eq!(windows.classify(2.0), None);
    }

    #[test]
    fn test_builder_keeps_defaults() {
        let windows = JudgmentWindows::builder().near(0.08).build();
        assert_eq!(windows.critical, WINDOW_SEC_CRITICAL);
        assert_eq!(windows.near, 0.08);
        assert_eq!(windows.error, WINDOW_SEC_ERROR);
    }

    #[test]
    fn test_validate_rejects_unordered_windows() {
        assert!(JudgmentWindows::default().validate().is_ok());
        let bad = JudgmentWindows::builder().critical(0.1).near(0.05).build();
        assert!(bad.validate().is_err());
        let bad = JudgmentWindows::builder().pre_hold(-0.1).build();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let windows: JudgmentWindows =
            serde_json::from_str(r#"{ "error": 0.2 }"#).expect("valid json");
        assert_eq!(windows.error, 0.2);
        assert_eq!(windows.critical, WINDOW_SEC_CRITICAL);
    }
}
