//! Harness error types

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that abort a run.
///
/// Failed assertions during sampling are not errors; they are tallied in the
/// report.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Failed to start reference collaborators: {0}")]
    Proxy(#[from] cachecmp_proxy::ProxyError),

    #[error("Response cache error: {0}")]
    Cache(#[from] cachecmp_caching::CacheError),

    #[error("HTTP client error: {0}")]
    Http(#[from] cachecmp_http::HttpError),

    #[error("Population failed at key {key}: {source}")]
    Populate {
        key: u64,
        #[source]
        source: cachecmp_http::HttpError,
    },

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
