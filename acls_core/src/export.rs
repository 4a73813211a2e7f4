//! Log export to files.
//!
//! Exports are written atomically so a half-written chart summary never
//! replaces a good one:
//! 1. Write to a temp file in the target directory
//! 2. Sync to disk
//! 3. Rename over the destination

use crate::monitor::{Monitor, MonitorObserver};
use crate::{Error, Result};
use fs2::FileExt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Output format for an exported log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::Other(format!("Unknown export format: {}", other))),
        }
    }
}

impl ExportFormat {
    /// Pick a format from a file extension, defaulting to text
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }
}

/// Render a monitor's log in the requested format
pub fn render<O: MonitorObserver>(monitor: &Monitor<O>, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(monitor.export_log_text()),
        ExportFormat::Csv => {
            let mut buf = Vec::new();
            monitor.log().write_csv(&mut buf)?;
            String::from_utf8(buf).map_err(|e| Error::Other(format!("CSV not UTF-8: {}", e)))
        }
        ExportFormat::Json => monitor.log().to_json(),
    }
}

/// Atomically write `contents` to `path`, creating parent directories
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;

    // Exclusive lock serializes concurrent exporters on the temp file
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported log to {:?}", path);
    Ok(())
}

/// Render and write in one step
pub fn export_to_file<O: MonitorObserver>(
    monitor: &Monitor<O>,
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    let contents = render(monitor, format)?;
    write_atomic(path, &contents)
}
