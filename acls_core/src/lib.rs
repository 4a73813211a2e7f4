#![forbid(unsafe_code)]

//! Core domain model and timer logic for the ACLS dose timer.
//!
//! This crate provides:
//! - Domain types (doses, alert levels, log entries)
//! - Session clock and the dose-interval alert engine
//! - Append-only event log with text, CSV and JSON export
//! - The `Monitor` facade driven by a periodic sampler
//! - Scripted replays, configuration and logging setup

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod alert;
pub mod clock;
pub mod tone;
pub mod event_log;
pub mod monitor;
pub mod export;
pub mod scenario;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use alert::{evaluate, AlertThresholds, DisplayStatus, DoseStatus, Evaluation, Severity};
pub use clock::{Sample, SessionClock};
pub use tone::{Tone, ToneQueue};
pub use event_log::EventLog;
pub use monitor::{EarlyDose, Monitor, MonitorObserver, NullObserver, TickReport};
pub use export::{export_to_file, write_atomic, ExportFormat};
pub use scenario::{ReplayClock, Scenario};
