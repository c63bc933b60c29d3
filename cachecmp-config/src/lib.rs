//! Domain-driven configuration management for cachecmp
//!
//! Configuration is split by functional domain (harness workload, HTTP
//! transport, system under test, logging), with validation, defaults and
//! environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    harness::{HarnessConfig, SampleBudget, MAX_WORKER_MULTIPLIER},
    http::HttpConfig,
    logging::LoggingConfig,
    sut::{
        DeploymentConfig, StoreConfig, SutConfig, VariantKind, MAX_POPULATE_CONCURRENCY,
    },
    CachecmpConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
