//! Session clock: anchors, counters and the alert latch.
//!
//! The clock holds plain state. It never logs entries itself; the
//! [`Monitor`](crate::monitor::Monitor) pairs each mutation with the matching
//! log entry.

use crate::{AlertLevel, DoseCounts, DoseKind};
use chrono::{DateTime, Local};
use uuid::Uuid;

/// Elapsed durations observed by one sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    pub at: DateTime<Local>,
    pub elapsed_total: u32,
    pub since_dose: Option<u32>,
}

/// State of one resuscitation episode
#[derive(Clone, Debug, Default)]
pub struct SessionClock {
    started_at: Option<DateTime<Local>>,
    last_dose_at: Option<DateTime<Local>>,
    alert_level: AlertLevel,
    counts: DoseCounts,
    session_id: Option<Uuid>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn last_dose_at(&self) -> Option<DateTime<Local>> {
        self.last_dose_at
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.alert_level
    }

    pub fn counts(&self) -> DoseCounts {
        self.counts
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Whole seconds since session start
    pub fn elapsed_total(&self, now: DateTime<Local>) -> Option<u32> {
        self.started_at.map(|start| whole_seconds(start, now))
    }

    /// Whole seconds since the last epinephrine dose
    pub fn elapsed_since_dose(&self, now: DateTime<Local>) -> Option<u32> {
        self.last_dose_at.map(|dose| whole_seconds(dose, now))
    }

    /// Sample elapsed durations; `None` while no session is running
    pub fn sample(&self, now: DateTime<Local>) -> Option<Sample> {
        let elapsed_total = self.elapsed_total(now)?;
        Some(Sample {
            at: now,
            elapsed_total,
            since_dose: self.elapsed_since_dose(now),
        })
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Start the session unless already running; returns true if it started
    pub fn start_if_needed(&mut self, now: DateTime<Local>) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        let id = Uuid::new_v4();
        self.started_at = Some(now);
        self.session_id = Some(id);
        tracing::info!("Session {} started at {}", id, now.format("%H:%M:%S"));
        true
    }

    pub fn record_dose(&mut self, kind: DoseKind, now: DateTime<Local>) {
        match kind {
            DoseKind::Epinephrine => {
                self.counts.epinephrine += 1;
                self.last_dose_at = Some(now);
                self.alert_level = AlertLevel::None;
            }
            DoseKind::Amiodarone => {
                self.counts.amiodarone += 1;
            }
        }
        tracing::debug!("Recorded {} dose, counts now {:?}", kind, self.counts);
    }

    /// Count a shock and return its ordinal within the session
    pub fn record_shock(&mut self) -> u32 {
        self.counts.shocks += 1;
        self.counts.shocks
    }

    /// Latch a level produced by the alert engine
    ///
    /// Lower levels are ignored; only a dose or reset clears the latch.
    pub fn latch(&mut self, level: AlertLevel) {
        if level > self.alert_level {
            self.alert_level = level;
        }
    }

    pub fn reset(&mut self) {
        if let Some(id) = self.session_id {
            tracing::info!("Session {} reset", id);
        }
        *self = Self::default();
    }
}

fn whole_seconds(from: DateTime<Local>, to: DateTime<Local>) -> u32 {
    let secs = (to - from).num_seconds().max(0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_unset_anchors_return_none() {
        let clock = SessionClock::new();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_total(t0()), None);
        assert_eq!(clock.elapsed_since_dose(t0()), None);
        assert!(clock.sample(t0()).is_none());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut clock = SessionClock::new();
        assert!(clock.start_if_needed(t0()));
        let id = clock.session_id();

        assert!(!clock.start_if_needed(t0() + Duration::seconds(30)));
        assert_eq!(clock.started_at(), Some(t0()));
        assert_eq!(clock.session_id(), id);
    }

    #[test]
    fn test_elapsed_floors_and_clamps() {
        let mut clock = SessionClock::new();
        clock.start_if_needed(t0());

        assert_eq!(
            clock.elapsed_total(t0() + Duration::milliseconds(1999)),
            Some(1)
        );
        assert_eq!(clock.elapsed_total(t0() - Duration::seconds(5)), Some(0));
    }

    #[test]
    fn test_epinephrine_resets_latch() {
        let mut clock = SessionClock::new();
        clock.start_if_needed(t0());
        clock.record_dose(DoseKind::Epinephrine, t0());
        clock.latch(AlertLevel::Critical);

        let later = t0() + Duration::seconds(320);
        clock.record_dose(DoseKind::Epinephrine, later);

        assert_eq!(clock.alert_level(), AlertLevel::None);
        assert_eq!(clock.last_dose_at(), Some(later));
        assert_eq!(clock.counts().epinephrine, 2);
    }

    #[test]
    fn test_amiodarone_leaves_dose_timer() {
        let mut clock = SessionClock::new();
        clock.start_if_needed(t0());
        clock.record_dose(DoseKind::Epinephrine, t0());
        clock.latch(AlertLevel::Warned);

        clock.record_dose(DoseKind::Amiodarone, t0() + Duration::seconds(200));

        assert_eq!(clock.last_dose_at(), Some(t0()));
        assert_eq!(clock.alert_level(), AlertLevel::Warned);
        assert_eq!(clock.counts().amiodarone, 1);
    }

    #[test]
    fn test_latch_never_lowers() {
        let mut clock = SessionClock::new();
        clock.latch(AlertLevel::Critical);
        clock.latch(AlertLevel::Warned);
        assert_eq!(clock.alert_level(), AlertLevel::Critical);
    }

    #[test]
    fn test_shock_does_not_touch_dose_timer() {
        let mut clock = SessionClock::new();
        clock.start_if_needed(t0());
        assert_eq!(clock.record_shock(), 1);
        assert_eq!(clock.record_shock(), 2);
        assert_eq!(clock.last_dose_at(), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut clock = SessionClock::new();
        clock.start_if_needed(t0());
        clock.record_dose(DoseKind::Epinephrine, t0());
        clock.record_shock();
        clock.latch(AlertLevel::Warned);

        clock.reset();

        assert!(!clock.is_running());
        assert_eq!(clock.last_dose_at(), None);
        assert_eq!(clock.alert_level(), AlertLevel::None);
        assert_eq!(clock.counts(), DoseCounts::default());
        assert_eq!(clock.session_id(), None);
    }
}
