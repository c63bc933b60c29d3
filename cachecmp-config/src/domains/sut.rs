//! System-under-test configuration

use crate::error::ConfigResult;
use crate::validation::{
    validate_bounded, validate_header_name, validate_positive, validate_required_string,
    validate_url, Validatable,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on requests in flight while populating
pub const MAX_POPULATE_CONCURRENCY: usize = 10_000;

/// Which caching proxy is being exercised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// NGINX-style reverse proxy cache
    Baseline,
    /// Cache middleware wrapping a host-dispatch router
    #[default]
    Custom,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Baseline => write!(f, "baseline"),
            VariantKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" | "nginx" => Ok(VariantKind::Baseline),
            "custom" => Ok(VariantKind::Custom),
            _ => Err(format!("Invalid variant: {}", s)),
        }
    }
}

/// System-under-test configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SutConfig {
    /// Variant preset (header name and population concurrency)
    #[serde(default)]
    pub variant: VariantKind,

    /// Host header sent with every request
    #[serde(default = "default_virtual_host")]
    pub virtual_host: String,

    /// Overrides the preset cache-status header name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_status_header: Option<String>,

    /// Overrides the preset population concurrency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate_concurrency: Option<usize>,

    /// Where the proxy comes from
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

/// How the harness obtains a running proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeploymentConfig {
    /// Start the reference origin and caching proxy inside the harness process
    InProcess {
        #[serde(default = "default_bind_address")]
        bind_address: String,
        #[serde(default)]
        store: StoreConfig,
    },
    /// Connect to a proxy that is already running
    External { base_url: String },
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        DeploymentConfig::InProcess {
            bind_address: default_bind_address(),
            store: StoreConfig::default(),
        }
    }
}

/// Response store backing the in-process proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of cached responses; unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    /// Responses larger than this are forwarded but never stored
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            max_response_size: default_max_response_size(),
        }
    }
}

impl Default for SutConfig {
    fn default() -> Self {
        Self {
            variant: VariantKind::default(),
            virtual_host: default_virtual_host(),
            cache_status_header: None,
            populate_concurrency: None,
            deployment: DeploymentConfig::default(),
        }
    }
}

impl Validatable for SutConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.virtual_host, "virtual_host", self.domain_name())?;

        if let Some(ref header) = self.cache_status_header {
            validate_header_name(header, "cache_status_header", self.domain_name())?;
        }

        if let Some(concurrency) = self.populate_concurrency {
            validate_bounded(
                concurrency,
                MAX_POPULATE_CONCURRENCY,
                "populate_concurrency",
                self.domain_name(),
            )?;
        }

        self.deployment.validate()
    }

    fn domain_name(&self) -> &'static str {
        "sut"
    }
}

impl Validatable for DeploymentConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            DeploymentConfig::InProcess {
                bind_address,
                store,
            } => {
                validate_required_string(bind_address, "bind_address", self.domain_name())?;
                store.validate()
            }
            DeploymentConfig::External { base_url } => {
                validate_url(base_url, "base_url", self.domain_name())
            }
        }
    }

    fn domain_name(&self) -> &'static str {
        "sut.deployment"
    }
}

impl Validatable for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(capacity) = self.capacity {
            validate_positive(capacity, "capacity", self.domain_name())?;
        }
        validate_positive(
            self.max_response_size,
            "max_response_size",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "sut.deployment.store"
    }
}

// Default value functions
fn default_virtual_host() -> String {
    "a.example.com".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_max_response_size() -> usize {
    1024 * 1024
}
