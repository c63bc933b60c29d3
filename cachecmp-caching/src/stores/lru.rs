//! LRU (Least Recently Used) cache implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use crate::{
    cache::{Cache, CacheKey, CacheValue},
    stats::{create_stats_collector, SharedStatsCollector},
    CacheError, CacheResult, CacheStats,
};

/// Bounded cache that evicts the least recently used entry once full.
///
/// A lookup reorders entries, so every operation takes the same mutex.
pub struct LruCache<K: CacheKey, V> {
    store: Mutex<lru::LruCache<K, V>>,
    stats: SharedStatsCollector,
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> LruCache<K, V> {
    /// Create a new LRU cache with specified capacity
    pub fn new(capacity: usize) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            CacheError::InvalidConfiguration(
                "LRU cache capacity must be greater than 0".to_string(),
            )
        })?;

        Ok(Self {
            store: Mutex::new(lru::LruCache::new(capacity)),
            stats: create_stats_collector(),
        })
    }
}

#[async_trait]
impl<K: CacheKey + 'static, V: CacheValue + 'static> Cache<K, V> for LruCache<K, V> {
    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let value = self.store.lock().get(key).cloned();
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(value)
    }

    async fn put(&self, key: K, value: V) -> CacheResult<()> {
        let pushed_out = {
            let mut store = self.store.lock();
            // push hands back the old value on overwrite, which is not an eviction
            match store.push(key.clone(), value) {
                Some((old_key, _)) if old_key != key => Some(old_key),
                _ => None,
            }
        };

        if let Some(old_key) = pushed_out {
            log::trace!("Evicted {:?} to make room for {:?}", old_key, key);
            self.stats.record_evictions(1);
        }
        self.stats.record_put();
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.store.lock().len())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let len = self.len().await?;
        Ok(self.stats.snapshot(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = LruCache::new(3).unwrap();

        cache.put("key1", "value1").await.unwrap();
        cache.put("key2", "value2").await.unwrap();
        cache.put("key3", "value3").await.unwrap();

        // Access key1 to make it most recently used
        cache.get(&"key1").await.unwrap();

        // Add key4, should evict key2 (least recently used)
        cache.put("key4", "value4").await.unwrap();

        assert_eq!(cache.get(&"key1").await.unwrap(), Some("value1"));
        assert_eq!(cache.get(&"key2").await.unwrap(), None);
        assert_eq!(cache.get(&"key3").await.unwrap(), Some("value3"));
        assert_eq!(cache.get(&"key4").await.unwrap(), Some("value4"));

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entry_count, 3);
    }

    #[tokio::test]
    async fn test_overwrite_is_not_eviction() {
        let cache = LruCache::new(2).unwrap();

        cache.put("key1", 1).await.unwrap();
        cache.put("key1", 2).await.unwrap();

        assert_eq!(cache.get(&"key1").await.unwrap(), Some(2));
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.puts, 2);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_rejected() {
        let result = LruCache::<String, String>::new(0);
        assert!(matches!(result, Err(CacheError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_capacity_smaller_than_keyspace() {
        let cache = LruCache::new(10).unwrap();

        for i in 0..100u32 {
            cache.put(i, i).await.unwrap();
        }

        assert_eq!(cache.len().await.unwrap(), 10);
        assert_eq!(cache.get(&0).await.unwrap(), None);
        assert_eq!(cache.get(&99).await.unwrap(), Some(99));
        assert_eq!(cache.stats().await.unwrap().evictions, 90);
    }
}
