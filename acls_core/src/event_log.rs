//! Append-only event log for a resuscitation episode.
//!
//! Storage order is chronological. Renderers read most-recent-first through
//! [`EventLog::read_all`]; exports always walk in chronological order.

use crate::{DoseCounts, LogEntry, Result};
use chrono::{DateTime, Local};
use std::io::Write;

const RULE: &str = "------------------------";

/// Ordered store of log entries
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    time: String,
    elapsed: String,
    category: &'a str,
    description: &'a str,
    session_id: Option<String>,
}

impl<'a> From<&'a LogEntry> for CsvRow<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        CsvRow {
            time: entry.time_label(),
            elapsed: entry.elapsed_label(),
            category: entry.category.name(),
            description: &entry.description,
            session_id: entry.session_id.map(|id| id.to_string()),
        }
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        tracing::debug!("Log: {} {}", entry.elapsed_label(), entry.description);
        self.entries.push(entry);
    }

    /// Entries, most recent first
    pub fn read_all(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.entries.iter().rev()
    }

    /// Entries in chronological order
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        tracing::info!("Cleared {} log entries", removed);
        removed
    }

    /// Plain-text summary suitable for pasting into a chart
    pub fn export(&self, started_at: Option<DateTime<Local>>, counts: &DoseCounts) -> String {
        let start = started_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let mut text = String::from("急救紀錄 (ACLS Log):\n");
        text.push_str(&format!("開始時間: {}\n", start));
        text.push_str(RULE);
        text.push('\n');
        for entry in &self.entries {
            text.push_str(&format!(
                "[{}] ({}) {}\n",
                entry.time_label(),
                entry.elapsed_label(),
                entry.description
            ));
        }
        text.push_str(RULE);
        text.push('\n');
        text.push_str(&format!("統計: {}", counts.summary()));
        text
    }

    /// Write entries as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);
        for entry in &self.entries {
            writer.serialize(CsvRow::from(entry))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Entries as a pretty-printed JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}
