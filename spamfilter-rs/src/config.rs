//! Configuration for spamfilter-rs
//!
//! Settings come from an optional TOML file, overridden by `SPAMFILTER__*`
//! environment variables (e.g. `SPAMFILTER__SERVER__LISTEN_ADDR`).

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SpamError};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SPAMFILTER";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub classifier: ClassifierConfig,
    pub dataset: DatasetConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL holding the labelled dataset and the schedule state
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Posterior spam probability at or above which text is labelled spam
    pub spam_threshold: f64,
    /// Train once at boot when the dataset holds both classes
    pub train_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatasetConfig {
    /// Append every classified submission to the dataset
    pub record_predictions: bool,
}

/// Where the scheduled retrain runs relative to the triggering request
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrainMode {
    /// Spawn the retrain and return as soon as the digest is out
    #[default]
    Background,
    /// Await the retrain inside the gate invocation
    Inline,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Weekdays on which the digest + retrain job may run
    pub weekdays: Vec<Weekday>,
    pub retrain_mode: RetrainMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8088".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://spamfilter.db".to_string(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            spam_threshold: 0.5,
            train_on_startup: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekdays: vec![Weekday::Tue, Weekday::Thu],
            retrain_mode: RetrainMode::Background,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file only
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpamError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SpamError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("schedule.weekdays")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SpamError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SpamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let threshold = self.classifier.spam_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(SpamError::Config(format!(
                "classifier.spam_threshold must be in (0, 1), got {}",
                threshold
            )));
        }

        if self.schedule.weekdays.is_empty() {
            return Err(SpamError::Config(
                "schedule.weekdays must name at least one day".to_string(),
            ));
        }

        Ok(())
    }
}
