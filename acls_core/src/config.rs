//! Configuration file support for the ACLS timer.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/acls-timer/config.toml`.

use crate::alert::AlertThresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub sound: SoundConfig,

    #[serde(default)]
    pub sampler: SamplerConfig,
}

/// Dose interval thresholds, in seconds since the last epinephrine dose
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_warn_after_secs")]
    pub warn_after_secs: u32,

    #[serde(default = "default_overdue_after_secs")]
    pub overdue_after_secs: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warn_after_secs: default_warn_after_secs(),
            overdue_after_secs: default_overdue_after_secs(),
        }
    }
}

impl AlertConfig {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            warn_after_secs: self.warn_after_secs,
            overdue_after_secs: self.overdue_after_secs,
        }
    }
}

/// Alert tone parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_sound_enabled")]
    pub enabled: bool,

    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,

    #[serde(default = "default_tone_ms")]
    pub tone_ms: u64,

    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: default_sound_enabled(),
            frequency_hz: default_frequency_hz(),
            tone_ms: default_tone_ms(),
            gap_ms: default_gap_ms(),
        }
    }
}

/// Periodic sampler configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// Default value functions
fn default_warn_after_secs() -> u32 {
    180
}

fn default_overdue_after_secs() -> u32 {
    300
}

fn default_sound_enabled() -> bool {
    true
}

fn default_frequency_hz() -> u32 {
    880
}

fn default_tone_ms() -> u64 {
    300
}

fn default_gap_ms() -> u64 {
    100
}

fn default_interval_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("acls-timer").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject threshold combinations the alert engine cannot honour
    pub fn validate(&self) -> Result<()> {
        let alerts = &self.alerts;
        if alerts.warn_after_secs == 0 {
            return Err(Error::Config("warn_after_secs must be positive".into()));
        }
        if alerts.warn_after_secs >= alerts.overdue_after_secs {
            return Err(Error::Config(format!(
                "warn_after_secs ({}) must be below overdue_after_secs ({})",
                alerts.warn_after_secs, alerts.overdue_after_secs
            )));
        }
        if self.sampler.interval_ms == 0 {
            return Err(Error::Config("sampler interval_ms must be positive".into()));
        }
        Ok(())
    }
}
