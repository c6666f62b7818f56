/// Tracker configuration loader - parses tracker.toml
///
/// Keeps the event thresholds out of the code so the gap lag, margins, and
/// reference offset can be tuned without recompiling the service. Every key
/// is optional; a missing file is an error only when a path was given
/// explicitly.

use chrono::Duration;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "tracker.toml";

/// Event detection and run parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Readings with `road_water_level_adj` above this count as flooding.
    pub flood_cutoff: f64,

    /// Gap between consecutive readings that starts a new event.
    pub event_lag_hours: i64,

    /// Padding applied to both ends of previously recorded events.
    pub record_margin_minutes: i64,

    /// An event must have ended at least this long before the reference
    /// time to be finalized.
    pub settle_margin_minutes: i64,

    /// Reference time = now minus this offset, so late data can settle.
    pub reference_offset_hours: i64,

    /// Half-width of the window used to match photos to readings.
    pub picture_tolerance_minutes: i64,

    /// How far back the reading source looks.
    pub lookback_days: i64,

    /// Worker threads for per-site processing.
    pub worker_threads: usize,

    /// Whether to attach photo links from the archive.
    pub attach_pictures: bool,

    /// Interval between runs in watch mode.
    pub poll_interval_minutes: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            flood_cutoff: 0.0,
            event_lag_hours: 2,
            record_margin_minutes: 30,
            settle_margin_minutes: 30,
            reference_offset_hours: 4,
            picture_tolerance_minutes: 5,
            lookback_days: 21,
            worker_threads: 4,
            attach_pictures: false,
            poll_interval_minutes: 60,
        }
    }
}

impl TrackerConfig {
    pub fn event_lag(&self) -> Duration {
        Duration::hours(self.event_lag_hours)
    }

    pub fn record_margin(&self) -> Duration {
        Duration::minutes(self.record_margin_minutes)
    }

    pub fn settle_margin(&self) -> Duration {
        Duration::minutes(self.settle_margin_minutes)
    }

    pub fn reference_offset(&self) -> Duration {
        Duration::hours(self.reference_offset_hours)
    }

    pub fn picture_tolerance(&self) -> Duration {
        Duration::minutes(self.picture_tolerance_minutes)
    }

    pub fn lookback(&self) -> Duration {
        Duration::days(self.lookback_days)
    }

    /// Rejects values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.event_lag_hours <= 0 {
            return Err(Error::Config("event_lag_hours must be positive".into()));
        }
        if self.record_margin_minutes < 0 || self.settle_margin_minutes < 0 {
            return Err(Error::Config("margins must not be negative".into()));
        }
        if self.reference_offset_hours < 0 {
            return Err(Error::Config("reference_offset_hours must not be negative".into()));
        }
        if self.picture_tolerance_minutes <= 0 {
            return Err(Error::Config("picture_tolerance_minutes must be positive".into()));
        }
        if self.lookback_days <= 0 {
            return Err(Error::Config("lookback_days must be positive".into()));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<TrackerConfig> {
    let config: TrackerConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`.
///
/// With no explicit path, a missing `tracker.toml` falls back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };

    if !explicit && !path.exists() {
        tracing::info!("{} not found, using default configuration", DEFAULT_CONFIG_PATH);
        return Ok(TrackerConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

// ---------------------------------------------------------------------------
// Collaborator settings from the environment
// ---------------------------------------------------------------------------

/// Event log location and access token.
#[derive(Debug, Clone)]
pub struct SheetSettings {
    pub sheet_id: String,
    pub range: String,
    pub access_token: String,
}

/// Photo archive location and access token.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub drive_id: String,
    pub images_folder_id: String,
    pub access_token: String,
}

fn required_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::MissingEnv(name.to_string()))
}

impl SheetSettings {
    /// Reads `GOOGLE_SHEET_ID`, `GOOGLE_SHEET_RANGE` and `GOOGLE_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            sheet_id: required_env("GOOGLE_SHEET_ID")?,
            range: env::var("GOOGLE_SHEET_RANGE").unwrap_or_else(|_| "Sheet1".to_string()),
            access_token: required_env("GOOGLE_ACCESS_TOKEN")?,
        })
    }
}

impl ArchiveSettings {
    /// Reads `GOOGLE_DRIVE_ID`, `GOOGLE_IMAGES_FOLDER_ID` and `GOOGLE_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            drive_id: required_env("GOOGLE_DRIVE_ID")?,
            images_folder_id: required_env("GOOGLE_IMAGES_FOLDER_ID")?,
            access_token: required_env("GOOGLE_ACCESS_TOKEN")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_event_rules() {
        let config = TrackerConfig::default();
        assert_eq!(config.event_lag(), Duration::hours(2));
        assert_eq!(config.record_margin(), Duration::minutes(30));
        assert_eq!(config.reference_offset(), Duration::hours(4));
        assert_eq!(config.picture_tolerance(), Duration::minutes(5));
        assert_eq!(config.lookback(), Duration::days(21));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("").expect("empty config should parse");
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let config = parse_config(
            r#"
            event_lag_hours = 6
            attach_pictures = true
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.event_lag_hours, 6);
        assert!(config.attach_pictures);
        assert_eq!(config.record_margin_minutes, 30);
    }

    #[test]
    fn test_zero_lag_is_rejected() {
        let result = parse_config("event_lag_hours = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let result = parse_config("event_lag_hours = \"two\"");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = load_config(None).expect("tracker.toml should load");
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("does/not/exist.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
