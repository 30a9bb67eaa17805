//! Configuration
//!
//! A JSON file in which every field is optional:
//!
//! ```json
//! {
//!   "data_dir": "/srv/datasets",
//!   "cache_dir": "/var/cache/obsmeta",
//!   "categorical_max_unique": 20,
//!   "numeric_low_unique_warn": 15,
//!   "num_bins": 8,
//!   "cluster_name_hints": ["leiden", "louvain"],
//!   "log_level": "info"
//! }
//! ```
//!
//! Without a file, [`Config::default`] applies.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aggregate::{DEFAULT_NUM_BINS, MAX_NUM_BINS};
use crate::classify::ClassifierConfig;
use crate::observability::{log_event_with_fields, Event, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `*.yaml` documents and their column files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Statistics cache location (default: `<data_dir>/cache`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_categorical_max_unique")]
    pub categorical_max_unique: usize,

    #[serde(default = "default_numeric_low_unique_warn")]
    pub numeric_low_unique_warn: usize,

    #[serde(default = "default_num_bins")]
    pub num_bins: usize,

    #[serde(default = "default_cluster_name_hints")]
    pub cluster_name_hints: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_categorical_max_unique() -> usize {
    20
}
fn default_numeric_low_unique_warn() -> usize {
    15
}
fn default_num_bins() -> usize {
    DEFAULT_NUM_BINS
}
fn default_cluster_name_hints() -> Vec<String> {
    vec!["leiden".to_string(), "louvain".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: None,
            categorical_max_unique: default_categorical_max_unique(),
            numeric_low_unique_warn: default_numeric_low_unique_warn(),
            num_bins: default_num_bins(),
            cluster_name_hints: default_cluster_name_hints(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.display().to_string().as_str())],
        );
        Ok(config)
    }

    /// Loads from `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.categorical_max_unique == 0 {
            return Err(ConfigError::Invalid(
                "categorical_max_unique must be > 0".to_string(),
            ));
        }

        if self.numeric_low_unique_warn == 0 {
            return Err(ConfigError::Invalid(
                "numeric_low_unique_warn must be > 0".to_string(),
            ));
        }

        if self.num_bins == 0 || self.num_bins > MAX_NUM_BINS {
            return Err(ConfigError::Invalid(format!(
                "num_bins must be between 1 and {}, got {}",
                MAX_NUM_BINS, self.num_bins
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Minimum log severity
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| ConfigError::Invalid(e))
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// Cache directory, defaulting below the data directory
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cache"))
    }

    /// Classification thresholds
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            categorical_max_unique: self.categorical_max_unique,
            numeric_low_unique_warn: self.numeric_low_unique_warn,
            cluster_name_hints: self.cluster_name_hints.clone(),
        }
    }
}
