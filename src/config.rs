//! Configuration for the emotion engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Settings fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long samples are retained in the window
    #[serde(with = "duration_ms_serde")]
    pub window_duration: Duration,

    /// Minimum time between successive results
    #[serde(with = "duration_ms_serde")]
    pub emission_period: Duration,

    /// Minimum number of clean RR intervals required to emit
    pub min_rr_count: usize,

    /// Personal resting heart rate subtracted from the HR mean feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_baseline: Option<f64>,

    /// Prior probability per label; stored but not applied by the classifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priors: Option<BTreeMap<String, f64>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_secs(10),
            emission_period: Duration::from_secs(5),
            min_rr_count: 10,
            hr_baseline: None,
            priors: None,
        }
    }
}

impl EngineConfig {
    pub fn with_window_duration(mut self, window_duration: Duration) -> Self {
        self.window_duration = window_duration;
        self
    }

    pub fn with_emission_period(mut self, emission_period: Duration) -> Self {
        self.emission_period = emission_period;
        self
    }

    pub fn with_min_rr_count(mut self, min_rr_count: usize) -> Self {
        self.min_rr_count = min_rr_count;
        self
    }

    pub fn with_hr_baseline(mut self, hr_baseline: f64) -> Self {
        self.hr_baseline = Some(hr_baseline);
        self
    }

    pub fn with_priors(mut self, priors: BTreeMap<String, f64>) -> Self {
        self.priors = Some(priors);
        self
    }

    /// Check that the settings describe a usable window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_duration.is_zero() {
            return Err(ConfigError::Invalid(
                "window_duration must be greater than zero".to_string(),
            ));
        }
        if let Some(baseline) = self.hr_baseline {
            if !baseline.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "hr_baseline must be finite, got {baseline}"
                )));
            }
        }
        Ok(())
    }
}

/// Main configuration for the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Model bundle to load instead of the built-in default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-emotion")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
