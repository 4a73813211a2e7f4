//! Error types for the acls_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for acls_core operations
///
/// The timer state machine itself never fails; these variants cover the
/// edges that touch the outside world (config files, exports, scripts).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Replay scenario could not be parsed
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
