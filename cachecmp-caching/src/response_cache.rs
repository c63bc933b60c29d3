//! HTTP response cache used by the reference proxy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    cache::Cache,
    config::ResponseCacheConfig,
    stores::{InMemoryCache, LruCache},
    CacheError, CacheResult, CacheStats,
};

/// Cache key: virtual host plus path and query.
///
/// Two hosts serving the same path never share an entry.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ResponseKey {
    /// Host header value, port stripped and lowercased
    pub host: String,

    /// Path including the query string
    pub path: String,
}

impl ResponseKey {
    /// Create a new cache key
    pub fn new(host: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            host: host.as_ref().to_ascii_lowercase(),
            path: path.into(),
        }
    }
}

/// Cached HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Status code
    pub status: u16,

    /// Response headers in origin order; values kept as raw bytes
    pub headers: Vec<(String, Vec<u8>)>,

    /// Response body
    pub body: Vec<u8>,

    /// When the response was cached
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Capture a response now
    pub fn new(status: u16, headers: Vec<(String, Vec<u8>)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            cached_at: Utc::now(),
        }
    }

    /// Response size in bytes
    pub fn size_bytes(&self) -> usize {
        self.body.len()
    }
}

/// Response cache handle
pub struct ResponseCache {
    inner: ResponseCacheImpl,
    config: ResponseCacheConfig,
}

enum ResponseCacheImpl {
    Unlimited(InMemoryCache<ResponseKey, Arc<CachedResponse>>),
    Bounded(LruCache<ResponseKey, Arc<CachedResponse>>),
}

impl ResponseCache {
    /// Create a response cache from configuration
    pub fn from_config(config: ResponseCacheConfig) -> CacheResult<Self> {
        let Some(capacity) = config.capacity else {
            log::debug!("Using unlimited response store");
            return Ok(Self {
                config,
                ..Self::unlimited()
            });
        };

        log::debug!("Using LRU response store with capacity {}", capacity);
        Ok(Self {
            inner: ResponseCacheImpl::Bounded(LruCache::new(capacity)?),
            config,
        })
    }

    /// Create an unlimited response cache
    pub fn unlimited() -> Self {
        Self {
            inner: ResponseCacheImpl::Unlimited(InMemoryCache::new()),
            config: ResponseCacheConfig::default(),
        }
    }

    /// Get a cached response
    pub async fn get(&self, key: &ResponseKey) -> CacheResult<Option<Arc<CachedResponse>>> {
        match &self.inner {
            ResponseCacheImpl::Unlimited(cache) => cache.get(key).await,
            ResponseCacheImpl::Bounded(cache) => cache.get(key).await,
        }
    }

    /// Cache a response
    pub async fn put(&self, key: ResponseKey, response: CachedResponse) -> CacheResult<()> {
        if response.size_bytes() > self.config.max_response_size {
            return Err(CacheError::CapacityExceeded(format!(
                "Response size {} exceeds limit {}",
                response.size_bytes(),
                self.config.max_response_size
            )));
        }

        let response = Arc::new(response);
        match &self.inner {
            ResponseCacheImpl::Unlimited(cache) => cache.put(key, response).await,
            ResponseCacheImpl::Bounded(cache) => cache.put(key, response).await,
        }
    }

    /// Lookup, store and eviction counters plus the current entry count
    pub async fn stats(&self) -> CacheResult<CacheStats> {
        match &self.inner {
            ResponseCacheImpl::Unlimited(cache) => cache.stats().await,
            ResponseCacheImpl::Bounded(cache) => cache.stats().await,
        }
    }
}
