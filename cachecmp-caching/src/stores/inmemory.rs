//! Unbounded in-memory cache

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::{
    cache::{Cache, CacheKey, CacheValue},
    stats::{create_stats_collector, SharedStatsCollector},
    CacheResult, CacheStats,
};

/// In-memory cache that never evicts.
///
/// Lookups take the read lock only, so concurrent hits do not serialize.
pub struct InMemoryCache<K, V> {
    store: RwLock<HashMap<K, V>>,
    stats: SharedStatsCollector,
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> InMemoryCache<K, V> {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with an initial allocation hint
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::with_capacity(capacity)),
            stats: create_stats_collector(),
        }
    }
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> Default for InMemoryCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CacheKey + 'static, V: CacheValue + 'static> Cache<K, V> for InMemoryCache<K, V> {
    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let value = self.store.read().get(key).cloned();
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    async fn put(&self, key: K, value: V) -> CacheResult<()> {
        self.store.write().insert(key, value);
        self.stats.record_put();
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.store.read().len())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let len = self.len().await?;
        Ok(self.stats.snapshot(len))
    }
}
