//! Configuration loading and environment variable handling

use crate::domains::harness::SampleBudget;
use crate::domains::sut::DeploymentConfig;
use crate::domains::CachecmpConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "CACHECMP".to_string(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<CachecmpConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: CachecmpConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<CachecmpConfig> {
        let mut config = CachecmpConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<CachecmpConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut CachecmpConfig) -> ConfigResult<()> {
        self.apply_harness_overrides(&mut config.harness)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_sut_overrides(&mut config.sut)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_harness_overrides(
        &self,
        config: &mut crate::domains::harness::HarnessConfig,
    ) -> ConfigResult<()> {
        if let Some(keys) = self.parse_env::<u64>("KEYS")? {
            config.keys = keys;
        }

        if let Some(count) = self.parse_env::<u64>("SAMPLE_ITERATIONS")? {
            config.sample = SampleBudget::Iterations { count };
        }

        // A deadline wins over an iteration budget when both are set
        if let Some(seconds) = self.parse_env::<u64>("SAMPLE_SECONDS")? {
            config.sample = SampleBudget::Duration {
                seconds: Duration::from_secs(seconds),
            };
        }

        if let Some(multiplier) = self.parse_env::<usize>("WORKER_MULTIPLIER")? {
            config.worker_multiplier = multiplier;
        }

        if let Some(seed) = self.parse_env::<u64>("SEED")? {
            config.seed = Some(seed);
        }

        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Some(seconds) = self.parse_env::<u64>("HTTP_TIMEOUT")? {
            config.timeout = Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(())
    }

    fn apply_sut_overrides(&self, config: &mut crate::domains::sut::SutConfig) -> ConfigResult<()> {
        if let Ok(variant) = self.get_env_var("SUT_VARIANT") {
            config.variant = variant
                .parse::<crate::domains::sut::VariantKind>()
                .map_err(ConfigError::EnvError)?;
        }

        if let Ok(host) = self.get_env_var("SUT_VIRTUAL_HOST") {
            config.virtual_host = host;
        }

        if let Ok(header) = self.get_env_var("SUT_CACHE_HEADER") {
            config.cache_status_header = Some(header);
        }

        if let Some(concurrency) = self.parse_env::<usize>("SUT_POPULATE_CONCURRENCY")? {
            config.populate_concurrency = Some(concurrency);
        }

        if let Ok(base_url) = self.get_env_var("SUT_BASE_URL") {
            config.deployment = DeploymentConfig::External { base_url };
        }

        if let Some(capacity) = self.parse_env::<usize>("STORE_CAPACITY")? {
            match config.deployment {
                DeploymentConfig::InProcess { ref mut store, .. } => {
                    store.capacity = Some(capacity)
                }
                DeploymentConfig::External { .. } => {
                    log::warn!(
                        "Ignoring {}_STORE_CAPACITY for an external deployment",
                        self.prefix
                    );
                }
            }
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse an optional prefixed environment variable
    fn parse_env<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
