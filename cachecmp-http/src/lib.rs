//! Probe client for the cachecmp harness
//!
//! Every probe is a GET with an explicit `Host` header and connection reuse
//! disabled, so each request reaches the proxy on a fresh connection and is
//! routed by virtual host rather than by the address it was sent to.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{build_client, ProbeClient};
pub use config::HttpConfig;
pub use errors::{HttpError, HttpResult};
pub use types::{CacheStatus, ProbeResult, RequestDescriptor, HIT};
