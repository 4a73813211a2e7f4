//! Resuscitation monitor: the command surface for the presentation layer.
//!
//! A [`Monitor`] owns one [`SessionClock`], one [`EventLog`] and an observer.
//! Every command runs to completion before the next one is accepted, and
//! ticks read only the current anchors, so a tick arriving after a reset
//! observes the idle state and does nothing.
//!
//! ## Usage
//!
//! ```ignore
//! let mut monitor = Monitor::new(AlertThresholds::default(), MyObserver);
//! monitor.give_dose(DoseKind::Epinephrine, Local::now());
//! // Once per second:
//! monitor.tick(Local::now());
//! ```

use crate::alert::{self, AlertThresholds, DoseStatus};
use crate::clock::SessionClock;
use crate::event_log::EventLog;
use crate::{AlertLevel, Beep, Config, DoseKind, LogCategory, LogEntry};
use chrono::{DateTime, Local};
use std::time::Duration;

const SESSION_STARTED: &str = "急救開始";
const SESSION_ENDED: &str = "--- 急救結束 (重置狀態) ---";

/// Callbacks consumed by the presentation layer
pub trait MonitorObserver {
    /// Called on every tick while a session is running
    fn on_tick(&mut self, _report: &TickReport) {}

    /// Called after every append and clear, with entries in chronological order
    fn on_log_changed(&mut self, _entries: &[LogEntry]) {}

    /// Called exactly when the alert latch fires
    fn on_sound(&mut self, _beep: Beep) {}
}

/// Observer that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl MonitorObserver for NullObserver {}

/// Snapshot handed to `on_tick`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub at: DateTime<Local>,
    pub elapsed_total: u32,
    pub since_dose: Option<u32>,
    pub status: DoseStatus,
    pub level: AlertLevel,
    pub beep: Option<Beep>,
}

/// Warning that an epinephrine dose is earlier than the standard interval
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EarlyDose {
    pub since_last_secs: u32,
    pub minimum_secs: u32,
}

/// Owns one resuscitation episode: the session clock, the event log and
/// the observer that presents them
///
/// Every UI command and every sampler tick goes through here, so log
/// appends and alert latching always happen in a single place.
pub struct Monitor<O = NullObserver> {
    clock: SessionClock,
    log: EventLog,
    thresholds: AlertThresholds,
    observer: O,
}

impl<O: MonitorObserver> Monitor<O> {
    pub fn new(thresholds: AlertThresholds, observer: O) -> Self {
        Self {
            clock: SessionClock::new(),
            log: EventLog::new(),
            thresholds,
            observer,
        }
    }

    pub fn from_config(config: &Config, observer: O) -> Self {
        Self::new(config.alerts.thresholds(), observer)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Advisory for an epinephrine dose inside the warning window
    pub fn dose_advisory(&self, kind: DoseKind, now: DateTime<Local>) -> Option<EarlyDose> {
        if kind != DoseKind::Epinephrine {
            return None;
        }
        let since_last = self.clock.elapsed_since_dose(now)?;
        (since_last < self.thresholds.warn_after_secs).then_some(EarlyDose {
            since_last_secs: since_last,
            minimum_secs: self.thresholds.warn_after_secs,
        })
    }

    pub fn export_log_text(&self) -> String {
        self.log.export(self.clock.started_at(), &self.clock.counts())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the session on first interaction; returns true if it started
    pub fn start_session(&mut self, now: DateTime<Local>) -> bool {
        if !self.clock.start_if_needed(now) {
            return false;
        }
        self.append(now, SESSION_STARTED.to_string(), LogCategory::System);
        true
    }

    pub fn give_dose(&mut self, kind: DoseKind, now: DateTime<Local>) {
        self.start_session(now);
        if let Some(early) = self.dose_advisory(kind, now) {
            tracing::warn!(
                "Epinephrine given {}s after previous dose (minimum {}s)",
                early.since_last_secs,
                early.minimum_secs
            );
        }
        self.clock.record_dose(kind, now);
        self.append(now, format!("給藥: {}", kind), LogCategory::Medication);
    }

    /// Record a shock; returns the shock number within the session
    pub fn give_shock(&mut self, now: DateTime<Local>) -> u32 {
        self.start_session(now);
        let number = self.clock.record_shock();
        self.append(now, format!("執行電擊 (第 {} 次)", number), LogCategory::Shock);
        number
    }

    /// End the episode; the log keeps everything up to and including the
    /// terminal entry
    pub fn reset_session(&mut self, now: DateTime<Local>) {
        // Written before the clock clears so elapsed reflects the ending session
        self.append(now, SESSION_ENDED.to_string(), LogCategory::System);
        self.clock.reset();
    }

    pub fn clear_log(&mut self) -> usize {
        let removed = self.log.clear();
        self.observer.on_log_changed(self.log.entries());
        removed
    }

    /// One sampler tick; `None` when no session is running
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<TickReport> {
        let sample = self.clock.sample(now)?;
        let evaluation = alert::evaluate(
            sample.since_dose,
            self.clock.alert_level(),
            &self.thresholds,
        );
        self.clock.latch(evaluation.level);

        let report = TickReport {
            at: now,
            elapsed_total: sample.elapsed_total,
            since_dose: sample.since_dose,
            status: evaluation.status,
            level: self.clock.alert_level(),
            beep: evaluation.beep,
        };

        if let Some(beep) = evaluation.beep {
            tracing::info!(
                "{:?} alert at {}s since dose",
                evaluation.status,
                sample.since_dose.unwrap_or_default()
            );
            self.observer.on_sound(beep);
        }
        self.observer.on_tick(&report);
        Some(report)
    }

    fn append(&mut self, now: DateTime<Local>, description: String, category: LogCategory) {
        let elapsed = self
            .clock
            .elapsed_total(now)
            .map(|secs| Duration::from_secs(u64::from(secs)));
        self.log.append(LogEntry {
            at: now,
            elapsed,
            description,
            category,
            session_id: self.clock.session_id(),
        });
        self.observer.on_log_changed(self.log.entries());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoseCounts;
    use chrono::TimeZone;

    #[derive(Default)]
    struct Recorder {
        ticks: Vec<TickReport>,
        sounds: Vec<Beep>,
        log_changes: usize,
        last_log_len: usize,
    }

    impl MonitorObserver for Recorder {
        fn on_tick(&mut self, report: &TickReport) {
            self.ticks.push(*report);
        }

        fn on_log_changed(&mut self, entries: &[LogEntry]) {
            self.log_changes += 1;
            self.last_log_len = entries.len();
        }

        fn on_sound(&mut self, beep: Beep) {
            self.sounds.push(beep);
        }
    }

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Local> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn monitor() -> Monitor<Recorder> {
        crate::logging::init_test();
        Monitor::new(AlertThresholds::default(), Recorder::default())
    }

    #[test]
    fn test_start_logs_once() {
        let mut monitor = monitor();
        assert!(monitor.start_session(t0()));
        assert!(!monitor.start_session(at(10)));

        assert_eq!(monitor.log().len(), 1);
        assert_eq!(monitor.log().entries()[0].description, "急救開始");
        assert_eq!(monitor.observer().log_changes, 1);
    }

    #[test]
    fn test_reset_without_session_logs_terminal_entry() {
        let mut monitor = monitor();
        monitor.reset_session(t0());

        assert_eq!(monitor.log().len(), 1);
        let entry = &monitor.log().entries()[0];
        assert_eq!(entry.description, SESSION_ENDED);
        assert_eq!(entry.elapsed, None);
        assert_eq!(entry.elapsed_label(), "00:00");
        assert!(!monitor.clock().is_running());
        assert!(monitor.export_log_text().contains("(00:00) --- 急救結束 (重置狀態) ---"));
    }

    #[test]
    fn test_tick_without_session_is_noop() {
        let mut monitor = monitor();
        assert!(monitor.tick(t0()).is_none());
        assert!(monitor.observer().ticks.is_empty());
    }

    #[test]
    fn test_beeps_once_per_threshold() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());

        let mut beeps = Vec::new();
        for s in 1..=400 {
            if let Some(beep) = monitor.tick(at(s)).and_then(|r| r.beep) {
                beeps.push((s, beep));
            }
        }

        assert_eq!(beeps, vec![(180, Beep::Single), (300, Beep::Double)]);
        assert_eq!(monitor.observer().sounds.len(), 2);
        assert_eq!(monitor.observer().ticks.len(), 400);
    }

    #[test]
    fn test_level_monotonic_between_doses() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());

        let mut previous = AlertLevel::None;
        for s in [10, 200, 150, 320, 5, 310] {
            let report = monitor.tick(at(s)).unwrap();
            assert!(report.level >= previous);
            previous = report.level;
        }
        assert_eq!(previous, AlertLevel::Critical);
    }

    #[test]
    fn test_delayed_sampler_fires_critical_only() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());

        assert_eq!(monitor.tick(at(100)).unwrap().beep, None);
        let report = monitor.tick(at(350)).unwrap();

        assert_eq!(report.beep, Some(Beep::Double));
        assert_eq!(report.status, DoseStatus::Overdue);
        assert_eq!(monitor.observer().sounds, vec![Beep::Double]);
    }

    #[test]
    fn test_epinephrine_rearms_latch() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());
        monitor.tick(at(310));
        assert_eq!(monitor.clock().alert_level(), AlertLevel::Critical);

        monitor.give_dose(DoseKind::Epinephrine, at(320));
        assert_eq!(monitor.clock().alert_level(), AlertLevel::None);
        assert_eq!(monitor.clock().last_dose_at(), Some(at(320)));

        let report = monitor.tick(at(320 + 180)).unwrap();
        assert_eq!(report.beep, Some(Beep::Single));
    }

    #[test]
    fn test_amiodarone_leaves_latch() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());
        monitor.tick(at(200));

        monitor.give_dose(DoseKind::Amiodarone, at(210));

        assert_eq!(monitor.clock().alert_level(), AlertLevel::Warned);
        assert_eq!(monitor.clock().last_dose_at(), Some(t0()));
        assert_eq!(
            monitor.log().entries().last().unwrap().description,
            "給藥: Amiodarone"
        );
    }

    #[test]
    fn test_dose_advisory() {
        let mut monitor = monitor();
        assert_eq!(monitor.dose_advisory(DoseKind::Epinephrine, t0()), None);

        monitor.give_dose(DoseKind::Epinephrine, t0());
        assert_eq!(
            monitor.dose_advisory(DoseKind::Epinephrine, at(90)),
            Some(EarlyDose {
                since_last_secs: 90,
                minimum_secs: 180
            })
        );
        assert_eq!(monitor.dose_advisory(DoseKind::Epinephrine, at(180)), None);
        assert_eq!(monitor.dose_advisory(DoseKind::Amiodarone, at(90)), None);

        // The override still records the dose
        monitor.give_dose(DoseKind::Epinephrine, at(90));
        assert_eq!(monitor.clock().counts().epinephrine, 2);
    }

    #[test]
    fn test_shock_numbering() {
        let mut monitor = monitor();
        assert_eq!(monitor.give_shock(t0()), 1);
        assert_eq!(monitor.give_shock(at(120)), 2);

        let last = monitor.log().entries().last().unwrap();
        assert_eq!(last.description, "執行電擊 (第 2 次)");
        assert_eq!(last.category, LogCategory::Shock);
        assert_eq!(last.elapsed, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_reset_keeps_log_with_terminal_entry() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());
        monitor.give_shock(at(30));
        let session_id = monitor.clock().session_id();

        monitor.reset_session(at(400));

        assert!(!monitor.clock().is_running());
        assert_eq!(monitor.clock().counts(), DoseCounts::default());
        assert_eq!(monitor.clock().alert_level(), AlertLevel::None);

        let entries = monitor.log().entries();
        assert_eq!(entries.len(), 4);
        let terminal = entries.last().unwrap();
        assert_eq!(terminal.description, "--- 急救結束 (重置狀態) ---");
        assert_eq!(terminal.elapsed, Some(Duration::from_secs(400)));
        assert_eq!(terminal.session_id, session_id);
    }

    #[test]
    fn test_tick_after_reset_is_ignored() {
        let mut monitor = monitor();
        monitor.give_dose(DoseKind::Epinephrine, t0());
        monitor.reset_session(at(100));

        assert!(monitor.tick(at(350)).is_none());
        assert!(monitor.observer().sounds.is_empty());
    }

    #[test]
    fn test_new_session_after_reset_gets_new_id() {
        let mut monitor = monitor();
        monitor.start_session(t0());
        let first = monitor.clock().session_id();
        monitor.reset_session(at(60));
        monitor.start_session(at(120));

        assert_ne!(monitor.clock().session_id(), first);
        assert_eq!(monitor.log().entries()[2].elapsed, Some(Duration::ZERO));
    }

    #[test]
    fn test_clear_log() {
        let mut monitor = monitor();
        monitor.give_shock(t0());
        monitor.give_shock(at(1));

        assert_eq!(monitor.clear_log(), 3);
        assert!(monitor.log().is_empty());
        assert_eq!(monitor.observer().last_log_len, 0);
        // Clearing does not touch the running session
        assert!(monitor.clock().is_running());
    }

    #[test]
    fn test_export_log_text() {
        let mut monitor = monitor();
        monitor.start_session(t0());
        monitor.give_dose(DoseKind::Epinephrine, at(5));

        let text = monitor.export_log_text();

        assert!(text.contains("開始時間: 2024-01-01 10:00:00"));
        assert!(text.contains("[10:00:00] (+00:00) 急救開始"));
        assert!(text.contains("[10:00:05] (+00:05) 給藥: Epinephrine"));
        assert!(text.ends_with("統計: 電擊 0 次, Epi 1 次, Amio 0 次"));
    }
}
