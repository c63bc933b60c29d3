//! Response cache configuration

use serde::{Deserialize, Serialize};

/// Sizing for the proxy response cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheConfig {
    /// Maximum number of cached responses; `None` selects the unlimited store
    pub capacity: Option<usize>,

    /// Maximum response body size to cache (in bytes)
    pub max_response_size: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            max_response_size: 1024 * 1024,
        }
    }
}

impl From<cachecmp_config::StoreConfig> for ResponseCacheConfig {
    fn from(store: cachecmp_config::StoreConfig) -> Self {
        Self {
            capacity: store.capacity,
            max_response_size: store.max_response_size,
        }
    }
}
