//! Alert engine for the epinephrine dose interval.
//!
//! Evaluation is a pure function of the seconds since the last dose and the
//! level already latched for the current dose interval:
//!
//! ```text
//! since dose        status        latch               beep
//! unset             Idle          unchanged           -
//! < warn            Normal        unchanged           -
//! warn .. overdue   PrepareDose   None -> Warned      Single
//! >= overdue        Overdue       * -> Critical       Double
//! ```
//!
//! The latch compares the target level with the current one, so a sampler
//! that jumps straight past both thresholds fires only the critical beep.

use crate::{AlertLevel, Beep};
use serde::{Deserialize, Serialize};

/// Thresholds in seconds since the last epinephrine dose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub warn_after_secs: u32,
    pub overdue_after_secs: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warn_after_secs: 180,
            overdue_after_secs: 300,
        }
    }
}

/// Dose status derived from elapsed time on each tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    /// No epinephrine given yet
    Idle,
    Normal,
    PrepareDose,
    Overdue,
}

/// Visual severity for the renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Calm,
    Warning,
    Critical,
}

/// What the presentation layer shows for a status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayStatus {
    pub label: &'static str,
    pub severity: Severity,
}

impl DoseStatus {
    pub fn display(&self) -> DisplayStatus {
        match self {
            DoseStatus::Idle | DoseStatus::Normal => DisplayStatus {
                label: "",
                severity: Severity::Calm,
            },
            DoseStatus::PrepareDose => DisplayStatus {
                label: "準備給藥",
                severity: Severity::Warning,
            },
            DoseStatus::Overdue => DisplayStatus {
                label: "已超過給藥時間",
                severity: Severity::Critical,
            },
        }
    }
}

/// Result of one evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub status: DoseStatus,
    /// Level to latch; never below the level passed in
    pub level: AlertLevel,
    /// Set only when the latch moved on this evaluation
    pub beep: Option<Beep>,
}

/// Evaluate the dose interval
pub fn evaluate(
    since_dose_secs: Option<u32>,
    level: AlertLevel,
    thresholds: &AlertThresholds,
) -> Evaluation {
    let Some(secs) = since_dose_secs else {
        return Evaluation {
            status: DoseStatus::Idle,
            level,
            beep: None,
        };
    };

    let (status, target) = if secs >= thresholds.overdue_after_secs {
        (DoseStatus::Overdue, AlertLevel::Critical)
    } else if secs >= thresholds.warn_after_secs {
        (DoseStatus::PrepareDose, AlertLevel::Warned)
    } else {
        (DoseStatus::Normal, AlertLevel::None)
    };

    if target > level {
        tracing::debug!("Alert latch {:?} -> {:?} at {}s since dose", level, target, secs);
        Evaluation {
            status,
            level: target,
            beep: target.beep(),
        }
    } else {
        Evaluation {
            status,
            level,
            beep: None,
        }
    }
}
