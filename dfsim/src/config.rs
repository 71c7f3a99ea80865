//! Run parameters.
//!
//! All fields of [`SimConfig`] have defaults, so a configuration file only
//! needs to list the parameters that differ:
//!
//! ```yaml
//! horizon: 3600
//! seed: 7
//! default_action_delay: { min: 1, max: 3 }
//! failure_policy: drop
//! summarize: [archive]
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::{Delay, SimTime};
use crate::util::document::DocumentFormat;

/// What happens when the simulated transformation of an action fails.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The failure halts the whole run with
    /// [`SimulationError::ActionExecutionFailed`](crate::simulation::SimulationError::ActionExecutionFailed).
    #[default]
    Abort,
    /// The record is dropped, the failure is logged and counted, and the
    /// action waits for its next input.
    Drop,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "drop" => Ok(Self::Drop),
            _ => Err(format!(
                "unknown failure policy `{s}` (expected `abort` or `drop`)"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Drop => f.write_str("drop"),
        }
    }
}

/// Simulation run parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Simulation horizon, in seconds.
    pub horizon: f64,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Capacity of queues that do not declare one.
    pub default_capacity: usize,
    /// Delay of actions that declare neither a delay nor a cron trigger.
    pub default_action_delay: Delay,
    /// Inter-arrival delay of instruments whose source does not declare one.
    pub default_interarrival: Delay,
    /// Failure probability of actions that do not declare one.
    pub default_failure_probability: f64,
    /// Number of records emitted by each instrument, unlimited if `None`.
    pub instrument_records: Option<u64>,
    /// Interval between two monitor samples, in seconds. The monitor is
    /// disabled if `None`.
    pub monitor_interval: Option<f64>,
    /// Unix timestamp corresponding to simulation time zero.
    pub epoch: u64,
    /// Handling of action failures.
    pub failure_policy: FailurePolicy,
    /// Number of actions of a given host that can hold a processing slot at
    /// the same time, unlimited if `None`.
    pub host_slots: Option<usize>,
    /// Channels whose full content is listed in the summary.
    pub summarize: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            horizon: 100_000.0,
            seed: 42,
            default_capacity: 40,
            default_action_delay: Delay::Uniform { min: 5, max: 20 },
            default_interarrival: Delay::Uniform { min: 1, max: 7 },
            default_failure_probability: 0.0,
            instrument_records: Some(5),
            monitor_interval: Some(1.0),
            epoch: 0,
            failure_policy: FailurePolicy::Abort,
            host_slots: None,
            summarize: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Loads a configuration from a YAML or JSON file.
    ///
    /// The format is selected from the file extension (`.json` for JSON,
    /// YAML otherwise). The loaded configuration is validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let config: Self = match DocumentFormat::from_path(path) {
            DocumentFormat::Json => {
                serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                    path: path.to_owned(),
                    source,
                })?
            }
            DocumentFormat::Yaml => {
                serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                    path: path.to_owned(),
                    source,
                })?
            }
        };
        config.validate()?;

        Ok(config)
    }

    /// Checks that all parameters are within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SimTime::from_secs(self.horizon).is_none() {
            return Err(ConfigError::invalid(
                "horizon",
                format!("must be a finite, non-negative number (got {})", self.horizon),
            ));
        }
        if self.default_capacity == 0 {
            return Err(ConfigError::invalid("default_capacity", "must be at least 1"));
        }
        self.default_action_delay
            .validate()
            .map_err(|e| ConfigError::invalid("default_action_delay", e.to_string()))?;
        self.default_interarrival
            .validate()
            .map_err(|e| ConfigError::invalid("default_interarrival", e.to_string()))?;
        if !(0.0..=1.0).contains(&self.default_failure_probability) {
            return Err(ConfigError::invalid(
                "default_failure_probability",
                format!("must lie in [0, 1] (got {})", self.default_failure_probability),
            ));
        }
        if let Some(interval) = self.monitor_interval {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(ConfigError::invalid(
                    "monitor_interval",
                    format!("must be a finite, positive number (got {interval})"),
                ));
            }
        }
        if self.host_slots == Some(0) {
            return Err(ConfigError::invalid("host_slots", "must be at least 1"));
        }

        Ok(())
    }

    /// Returns the simulation horizon.
    ///
    /// An invalid horizon is reported by [`validate`](Self::validate) and
    /// maps to time zero.
    pub fn horizon(&self) -> SimTime {
        SimTime::from_secs(self.horizon).unwrap_or(SimTime::ZERO)
    }
}

/// An error returned when run parameters are invalid or cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is out of range.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The configuration file could not be read.
    #[error("could not read configuration file {}", path.display())]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML or has unexpected fields.
    #[error("malformed YAML configuration file {}", path.display())]
    Yaml {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },
    /// The configuration file is not valid JSON or has unexpected fields.
    #[error("malformed JSON configuration file {}", path.display())]
    Json {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}
