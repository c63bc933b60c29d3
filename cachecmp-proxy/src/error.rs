//! Proxy error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors raised while starting or serving the reference collaborators
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request has no Host header")]
    MissingHost,

    #[error("No upstream configured for host '{0}'")]
    UnknownHost(String),

    #[error("Upstream request to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid route '{0}': expected HOST=URL")]
    InvalidRoute(String),

    #[error("Invalid cache status header: {0}")]
    InvalidHeader(String),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] cachecmp_http::HttpError),

    #[error("Cache error: {0}")]
    Cache(#[from] cachecmp_caching::CacheError),
}

impl ProxyError {
    /// Status code served when this error ends a request
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingHost | ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::UnknownHost(_) => StatusCode::MISDIRECTED_REQUEST,
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
