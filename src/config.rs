//! Service configuration.
//!
//! Settings come from built-in defaults, optionally patched by a TOML file,
//! then by environment variables:
//!
//! ```toml
//! [model]
//! dir = "models"
//! n_estimators = 100
//!
//! [clustering]
//! n_clusters = 3
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```
//!
//! The file is the explicit path if given, else `$CARBONSENSE_CONFIG`.
//! `CARBONSENSE_MODEL_DIR` and `CARBONSENSE_LOG_LEVEL` override the file.

use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CARBONSENSE_CONFIG";
/// Environment override for [`ModelConfig::dir`].
pub const MODEL_DIR_ENV: &str = "CARBONSENSE_MODEL_DIR";
/// Environment override for [`LoggingConfig::level`].
pub const LOG_LEVEL_ENV: &str = "CARBONSENSE_LOG_LEVEL";

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Emission model training and artifact locations
    pub model: ModelConfig,
    /// Profile segmentation
    pub clustering: ClusteringConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Emission model settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the artifact pair
    pub dir: PathBuf,
    /// Forest artifact file name
    pub model_file: String,
    /// Scaler artifact file name
    pub scaler_file: String,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Seed for both the synthetic corpus and the forest
    pub random_state: u64,
    /// Rows in the synthetic training corpus
    pub training_samples: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            model_file: "carbon_rf_model.bin".to_string(),
            scaler_file: "carbon_scaler.safetensors".to_string(),
            n_estimators: 100,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            random_state: 42,
            training_samples: 1000,
        }
    }
}

impl ModelConfig {
    /// Full path of the forest artifact.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    /// Full path of the scaler artifact.
    #[must_use]
    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler_file)
    }
}

/// Segmentation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Upper bound on clusters per batch
    pub n_clusters: usize,
    pub random_state: u64,
    pub max_iter: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            random_state: 42,
            max_iter: 300,
        }
    }
}

/// Log output settings, consumed by the binary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log line layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CarbonError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(CarbonError::Config(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from `explicit_path`, else `$CARBONSENSE_CONFIG`,
    /// else defaults, then applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] if the file cannot be read or parsed,
    /// or the result fails [`validate`](Self::validate).
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] on read or parse failure.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            CarbonError::Config(format!("could not read config file `{}`: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| CarbonError::Config(format!("{} (in `{}`)", e, path.display())))
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] on parse failure.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CarbonError::Config(format!("could not parse config: {e}")))
    }

    /// Applies overrides read through `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = read(MODEL_DIR_ENV) {
            self.model.dir = PathBuf::from(dir);
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
    }

    /// Rejects settings that cannot produce a working service.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.model.n_estimators == 0, "model.n_estimators must be greater than zero"),
            (self.model.training_samples == 0, "model.training_samples must be greater than zero"),
            (self.model.min_samples_leaf == 0, "model.min_samples_leaf must be greater than zero"),
            (self.model.model_file.trim().is_empty(), "model.model_file must not be empty"),
            (self.model.scaler_file.trim().is_empty(), "model.scaler_file must not be empty"),
            (
                self.model.model_file == self.model.scaler_file,
                "model.model_file and model.scaler_file must differ",
            ),
            (self.clustering.n_clusters == 0, "clustering.n_clusters must be greater than zero"),
            (self.logging.level.trim().is_empty(), "logging.level must not be empty"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(CarbonError::Config((*message).to_string())),
            None => Ok(()),
        }
    }
}
