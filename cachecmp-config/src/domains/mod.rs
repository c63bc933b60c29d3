//! Domain-specific configuration modules

pub mod harness;
pub mod http;
pub mod logging;
pub mod sut;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main cachecmp configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CachecmpConfig {
    /// Workload configuration
    #[serde(default)]
    pub harness: harness::HarnessConfig,

    /// HTTP transport configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// System-under-test configuration
    #[serde(default)]
    pub sut: sut::SutConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl CachecmpConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.harness.validate()?;
        self.http.validate()?;
        self.sut.validate()?;
        self.logging.validate()?;

        if let sut::DeploymentConfig::InProcess { ref store, .. } = self.sut.deployment {
            if let Some(capacity) = store.capacity {
                if (capacity as u64) < self.harness.keys {
                    log::warn!(
                        "Store capacity {} is smaller than the keyspace ({}); evictions will surface as misses",
                        capacity,
                        self.harness.keys
                    );
                }
            }
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = CachecmpConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
