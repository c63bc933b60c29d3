//! Harness workload configuration

use crate::error::ConfigResult;
use crate::validation::{
    validate_bounded, validate_positive, validate_required_string, Validatable,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on sampler workers per unit of hardware parallelism
pub const MAX_WORKER_MULTIPLIER: usize = 64;

/// Workload shape shared by the populate and sample phases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of distinct keys established during population
    #[serde(default = "default_keys")]
    pub keys: u64,

    /// How long the measurement phase runs
    #[serde(default)]
    pub sample: SampleBudget,

    /// Sampler workers per unit of available hardware parallelism
    #[serde(default = "default_worker_multiplier")]
    pub worker_multiplier: usize,

    /// Path prefix under which keys are addressed
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Seed for the sampler's key draws; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Budget shared by all sampler workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SampleBudget {
    /// Fixed number of iterations across all workers
    Iterations { count: u64 },

    /// Wall-clock deadline measured from the start of sampling
    Duration {
        #[serde(with = "crate::domains::utils::serde_duration")]
        seconds: Duration,
    },
}

impl Default for SampleBudget {
    fn default() -> Self {
        SampleBudget::Iterations {
            count: default_sample_iterations(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            keys: default_keys(),
            sample: SampleBudget::default(),
            worker_multiplier: default_worker_multiplier(),
            path_prefix: default_path_prefix(),
            seed: None,
        }
    }
}

impl Validatable for HarnessConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.keys, "keys", self.domain_name())?;
        validate_bounded(
            self.worker_multiplier,
            MAX_WORKER_MULTIPLIER,
            "worker_multiplier",
            self.domain_name(),
        )?;
        validate_required_string(&self.path_prefix, "path_prefix", self.domain_name())?;

        if !self.path_prefix.starts_with('/') {
            return Err(self.validation_error("path_prefix must start with '/'"));
        }

        match self.sample {
            SampleBudget::Iterations { count } => {
                validate_positive(count, "sample.count", self.domain_name())?;
            }
            SampleBudget::Duration { seconds } => {
                validate_positive(seconds.as_secs(), "sample.seconds", self.domain_name())?;
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "harness"
    }
}

// Default value functions
fn default_keys() -> u64 {
    10_000
}

fn default_sample_iterations() -> u64 {
    100_000
}

fn default_worker_multiplier() -> usize {
    1
}

fn default_path_prefix() -> String {
    "/cache".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_config_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.keys, 10_000);
        assert_eq!(config.worker_multiplier, 1);
        assert_eq!(config.path_prefix, "/cache");
        assert_eq!(config.sample, SampleBudget::Iterations { count: 100_000 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_harness_config_validation() {
        let mut config = HarnessConfig::default();
        config.keys = 0;
        assert!(config.validate().is_err());

        config = HarnessConfig::default();
        config.path_prefix = "cache".to_string();
        assert!(config.validate().is_err());

        config = HarnessConfig::default();
        config.sample = SampleBudget::Duration {
            seconds: Duration::from_secs(0),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_multiplier_is_capped() {
        let mut config = HarnessConfig::default();
        config.worker_multiplier = MAX_WORKER_MULTIPLIER;
        assert!(config.validate().is_ok());

        config.worker_multiplier = MAX_WORKER_MULTIPLIER + 1;
        assert!(config.validate().is_err());

        config.worker_multiplier = usize::MAX;
        assert!(config.validate().is_err());

        config.worker_multiplier = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_budget_yaml() {
        let budget: SampleBudget = serde_yaml::from_str("mode: duration\nseconds: 15\n").unwrap();
        assert_eq!(
            budget,
            SampleBudget::Duration {
                seconds: Duration::from_secs(15)
            }
        );

        let budget: SampleBudget = serde_yaml::from_str("mode: iterations\ncount: 500\n").unwrap();
        assert_eq!(budget, SampleBudget::Iterations { count: 500 });
    }
}
