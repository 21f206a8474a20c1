//! Configuration file support for LingoPet.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lingopet/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest review interval accepted from a config file (about 100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Spaced-repetition interval table
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Days until the next review for mastery levels 1..=N
    #[serde(default = "default_intervals_days")]
    pub intervals_days: Vec<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            intervals_days: default_intervals_days(),
        }
    }
}

/// Review session choreography and reward
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_narration_rate")]
    pub narration_rate: f32,

    /// Pause between the first narration and the illustration reveal
    #[serde(default = "default_settle_pause_ms")]
    pub settle_pause_ms: u64,

    /// Dwell time on a revealed card before auto-advancing
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    #[serde(default = "default_completion_xp")]
    pub completion_xp: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            narration_rate: default_narration_rate(),
            settle_pause_ms: default_settle_pause_ms(),
            dwell_ms: default_dwell_ms(),
            completion_xp: default_completion_xp(),
        }
    }
}

/// Runtime settings handed to a review session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub intervals_days: Vec<u32>,
    pub narration_rate: f32,
    pub settle_pause: Duration,
    pub dwell: Duration,
    pub completion_xp: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Config::default().session_settings()
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("lingopet")
}

fn default_intervals_days() -> Vec<u32> {
    crate::scheduler::DEFAULT_INTERVALS_DAYS.to_vec()
}

fn default_narration_rate() -> f32 {
    0.9
}

fn default_settle_pause_ms() -> u64 {
    500
}

fn default_dwell_ms() -> u64 {
    2500
}

fn default_completion_xp() -> u32 {
    50
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("lingopet").join("config.toml")
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

    /// Reject interval tables the scheduler cannot index sensibly
    pub fn validate(&self) -> Result<()> {
        let intervals = &self.schedule.intervals_days;
        if intervals.is_empty() {
            return Err(Error::Config("schedule.intervals_days must not be empty".into()));
        }
        if intervals.contains(&0) {
            return Err(Error::Config(
                "schedule.intervals_days must not contain a zero interval".into(),
            ));
        }
        if let Some(days) = intervals.iter().find(|&&days| days > MAX_INTERVAL_DAYS) {
            return Err(Error::Config(format!(
                "schedule.intervals_days entry {} exceeds the {} day maximum",
                days, MAX_INTERVAL_DAYS
            )));
        }
        if intervals.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(format!(
                "schedule.intervals_days must be strictly ascending, got {:?}",
                intervals
            )));
        }
        Ok(())
    }

    /// Settings for a review session built from this config
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            intervals_days: self.schedule.intervals_days.clone(),
            narration_rate: self.session.narration_rate,
            settle_pause: Duration::from_millis(self.session.settle_pause_ms),
            dwell: Duration::from_millis(self.session.dwell_ms),
            completion_xp: self.session.completion_xp,
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data.data_dir.join("store.json")
    }

    pub fn review_log_path(&self) -> PathBuf {
        self.data.data_dir.join("reviews.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schedule.intervals_days, vec![1, 3, 7, 14, 30]);
        assert_eq!(config.session.settle_pause_ms, 500);
        assert_eq!(config.session.dwell_ms, 2500);
        assert_eq!(config.session.completion_xp, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.schedule.intervals_days, parsed.schedule.intervals_days);
        assert_eq!(config.session.dwell_ms, parsed.session.dwell_ms);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
dwell_ms = 1000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.dwell_ms, 1000);
        assert_eq!(config.session.settle_pause_ms, 500); // default
        assert_eq!(config.schedule.intervals_days, vec![1, 3, 7, 14, 30]);
    }

    #[test]
    fn test_rejects_unordered_intervals() {
        let toml_str = r#"
[schedule]
intervals_days = [1, 7, 3]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_empty_intervals() {
        let mut config = Config::default();
        config.schedule.intervals_days.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_interval() {
        let mut config = Config::default();
        config.schedule.intervals_days = vec![1, 100_000_000];
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("maximum")));

        config.schedule.intervals_days = vec![1, MAX_INTERVAL_DAYS];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_validates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[schedule]\nintervals_days = [0, 2]\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.completion_xp = 75;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.session.completion_xp, 75);
    }

    #[test]
    fn test_session_settings_durations() {
        let settings = Config::default().session_settings();
        assert_eq!(settings.settle_pause, Duration::from_millis(500));
        assert_eq!(settings.dwell, Duration::from_millis(2500));
        assert_eq!(settings, SessionSettings::default());
    }
}
