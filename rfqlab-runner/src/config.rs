//! Serializable run configuration.
//!
//! A run is fully described by the model parameters, the backtest settings
//! and the execution options. The TOML layout mirrors the struct:
//!
//! ```toml
//! [params]
//! gamma = 0.001
//! A = 0.5
//! k_paper = 1.0
//! beta_0 = 0.0
//! beta_1 = -0.5
//! beta_2 = -0.0001
//!
//! [backtest]
//! default_rfq_size = 1000.0
//! fill_model = { type = "bernoulli", seed = 42 }
//! volatility = { type = "parkinson" }
//!
//! [execution]
//! parallel = true
//! threads = 4
//! ```
//!
//! Every section is optional; omitted sections take their defaults.

use std::path::{Path, PathBuf};

use rfqlab_core::{BacktestSettings, ModelParameters, VolatilityProxy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How instruments are scheduled across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Run instruments on the rayon pool. Output is identical either way.
    pub parallel: bool,
    /// Size of a dedicated thread pool. `None` uses the global pool.
    pub threads: Option<usize>,
    /// Keep the per-event fill tape in the run result.
    pub record_events: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            record_events: false,
        }
    }
}

/// Complete configuration for one batch backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub params: ModelParameters,
    #[serde(default)]
    pub backtest: BacktestSettings,
    #[serde(default)]
    pub execution: ExecutionOptions,
}

impl RunConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Checks the settings the model parameters do not cover.
    ///
    /// Model parameters validate themselves on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.backtest.default_rfq_size;
        if !size.is_finite() || size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "backtest.default_rfq_size must be positive and finite, got {size}"
            )));
        }
        if let VolatilityProxy::RelativeRange { scale } = self.backtest.volatility {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "backtest.volatility.scale must be positive and finite, got {scale}"
                )));
            }
        }
        if self.execution.threads == Some(0) {
            return Err(ConfigError::Invalid(
                "execution.threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Deterministic hash of the parts of the configuration that affect results.
    ///
    /// Scheduling options are excluded: a parallel and a sequential run over
    /// the same data produce the same report and share a run id.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(&(&self.params, &self.backtest))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Run id: BLAKE3 over the config hash and the dataset hash.
    pub fn run_id(&self, dataset_hash: &str) -> Result<RunId, ConfigError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.config_hash()?.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}
