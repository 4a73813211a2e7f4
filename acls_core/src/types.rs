//! Core domain types for the ACLS dose timer.
//!
//! This module defines the fundamental types shared by the clock, the
//! alert engine and the event log:
//! - Medications and counters
//! - Alert levels and beeps
//! - Log entries

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Medication Types
// ============================================================================

/// Medication recorded against the session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseKind {
    /// Restarts the dose interval
    Epinephrine,
    /// Counted only; never touches the dose timer
    Amiodarone,
}

impl DoseKind {
    pub fn name(&self) -> &'static str {
        match self {
            DoseKind::Epinephrine => "Epinephrine",
            DoseKind::Amiodarone => "Amiodarone",
        }
    }
}

impl fmt::Display for DoseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-session counters
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoseCounts {
    pub shocks: u32,
    pub epinephrine: u32,
    pub amiodarone: u32,
}

impl DoseCounts {
    /// Statistics line used at the foot of exports
    pub fn summary(&self) -> String {
        format!(
            "電擊 {} 次, Epi {} 次, Amio {} 次",
            self.shocks, self.epinephrine, self.amiodarone
        )
    }
}

// ============================================================================
// Alert Types
// ============================================================================

/// Which audible thresholds have already fired within the current dose interval
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    None,
    Warned,
    Critical,
}

impl AlertLevel {
    /// Beep played when the latch moves into this level
    pub fn beep(&self) -> Option<Beep> {
        match self {
            AlertLevel::None => None,
            AlertLevel::Warned => Some(Beep::Single),
            AlertLevel::Critical => Some(Beep::Double),
        }
    }
}

/// Sound request emitted by the latch
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Beep {
    Single,
    Double,
}

impl Beep {
    /// Number of discrete tones (the alert intensity)
    pub fn count(&self) -> u8 {
        match self {
            Beep::Single => 1,
            Beep::Double => 2,
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Category of a log entry, used by renderers for styling
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    System,
    Medication,
    Shock,
}

impl LogCategory {
    pub fn name(&self) -> &'static str {
        match self {
            LogCategory::System => "System",
            LogCategory::Medication => "Medication",
            LogCategory::Shock => "Shock",
        }
    }
}

/// One immutable line of the audit trail
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    /// Time since session start; `None` when written outside a session
    pub elapsed: Option<Duration>,
    pub description: String,
    pub category: LogCategory,
    pub session_id: Option<Uuid>,
}

impl LogEntry {
    /// Wall-clock time of day, `HH:MM:SS`
    pub fn time_label(&self) -> String {
        self.at.format("%H:%M:%S").to_string()
    }

    /// `+MM:SS` since session start, or `00:00` outside a session
    pub fn elapsed_label(&self) -> String {
        match self.elapsed {
            Some(elapsed) => format!("+{}", format_mmss(elapsed.as_secs())),
            None => "00:00".to_string(),
        }
    }
}

/// Format whole seconds as `MM:SS`; minutes grow past two digits as needed
pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_alert_level_ordering() {
        assert!(AlertLevel::None < AlertLevel::Warned);
        assert!(AlertLevel::Warned < AlertLevel::Critical);
        assert_eq!(AlertLevel::default(), AlertLevel::None);
    }

    #[test]
    fn test_beep_per_level() {
        assert_eq!(AlertLevel::None.beep(), None);
        assert_eq!(AlertLevel::Warned.beep().map(|b| b.count()), Some(1));
        assert_eq!(AlertLevel::Critical.beep().map(|b| b.count()), Some(2));
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(5), "00:05");
        assert_eq!(format_mmss(185), "03:05");
        assert_eq!(format_mmss(6000), "100:00");
    }

    #[test]
    fn test_entry_labels() {
        let entry = LogEntry {
            at: Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            elapsed: Some(Duration::from_secs(65)),
            description: "給藥: Epinephrine".into(),
            category: LogCategory::Medication,
            session_id: None,
        };
        assert_eq!(entry.time_label(), "10:00:00");
        assert_eq!(entry.elapsed_label(), "+01:05");

        let outside = LogEntry {
            elapsed: None,
            ..entry
        };
        assert_eq!(outside.elapsed_label(), "00:00");
    }

    #[test]
    fn test_counts_summary() {
        let counts = DoseCounts {
            shocks: 2,
            epinephrine: 3,
            amiodarone: 1,
        };
        assert_eq!(counts.summary(), "電擊 2 次, Epi 3 次, Amio 1 次");
    }
}
