//! Request and response types for cache probes

use serde::Serialize;
use std::fmt;

/// The only cache-status value that counts as a hit. Compared case-sensitively.
pub const HIT: &str = "HIT";

/// One probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Absolute target URL (connection target)
    pub url: String,

    /// Virtual host sent in the `Host` header
    pub host: String,

    /// Send `Connection: close`
    pub close: bool,
}

impl RequestDescriptor {
    /// Build a descriptor for `{base}{path}` with connection reuse disabled
    pub fn new(base_url: &str, path: &str, host: impl Into<String>) -> Self {
        Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            host: host.into(),
            close: true,
        }
    }

    /// Headers this descriptor adds to the request, for diagnostics
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![("host", self.host.as_str())];
        if self.close {
            headers.push(("connection", "close"));
        }
        headers
    }
}

/// Outcome of a probe that reached the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    /// HTTP status code
    pub status: u16,

    /// Value of the cache-status header, if present
    pub cache_status: Option<String>,
}

impl ProbeResult {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Classify the observed cache-status header
    pub fn cache_status(&self) -> CacheStatus {
        CacheStatus::from_header(self.cache_status.as_deref())
    }
}

/// Classification of the cache-status header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Other(String),
    Missing,
}

impl CacheStatus {
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(HIT) => CacheStatus::Hit,
            Some(other) => CacheStatus::Other(other.to_string()),
            None => CacheStatus::Missing,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "{}", HIT),
            CacheStatus::Other(value) => write!(f, "{}", value),
            CacheStatus::Missing => write!(f, "<missing>"),
        }
    }
}
