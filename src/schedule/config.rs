//! Scheduler configuration.

use crate::cp::SolverConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Search budget and execution options for a scheduling run.
///
/// # Examples
///
/// ```
/// use u_examsched::schedule::SchedulerConfig;
///
/// let config = SchedulerConfig::from_toml_str("time_limit_ms = 5000").unwrap();
/// assert_eq!(config.time_limit_ms, 5000);
/// assert_eq!(config.node_limit, 0);
///
/// let config = SchedulerConfig::default()
///     .with_time_limit_ms(2_000)
///     .with_stop_after_first(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock budget per request in milliseconds. 0 = no limit.
    pub time_limit_ms: u64,

    /// Search node budget per request. 0 = no limit.
    pub node_limit: u64,

    /// Return the first schedule found instead of minimizing the span.
    pub stop_after_first: bool,

    /// Solve batches on the rayon pool. Needs the `parallel` feature.
    pub parallel: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 30_000,
            node_limit: 0,
            stop_after_first: false,
            parallel: false,
        }
    }
}

impl SchedulerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string. Missing keys
    /// keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    ///
    /// A run must be bounded: at least one of `time_limit_ms` and
    /// `node_limit` has to be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_limit_ms == 0 && self.node_limit == 0 {
            return Err(ConfigError::Invalid(
                "time_limit_ms and node_limit cannot both be 0".into(),
            ));
        }
        Ok(())
    }

    /// The CP solver settings for one request.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_time_limit_ms(self.time_limit_ms)
            .with_node_limit(self.node_limit)
            .with_stop_after_first(self.stop_after_first)
    }
}
