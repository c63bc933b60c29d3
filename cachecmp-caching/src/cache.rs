//! Core cache traits and types

use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;

use crate::{CacheResult, CacheStats};

/// Trait for types that can be used as cache keys
pub trait CacheKey: Clone + Eq + Hash + Debug + Send + Sync {}

/// Trait for types that can be cached
pub trait CacheValue: Clone + Debug + Send + Sync {}

// Blanket implementations
impl<T> CacheKey for T where T: Clone + Eq + Hash + Debug + Send + Sync {}
impl<T> CacheValue for T where T: Clone + Debug + Send + Sync {}

/// Core cache trait
#[async_trait]
pub trait Cache<K: CacheKey + 'static, V: CacheValue + 'static>: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &K) -> CacheResult<Option<V>>;

    /// Put a value into the cache
    async fn put(&self, key: K, value: V) -> CacheResult<()>;

    /// Get the number of entries
    async fn len(&self) -> CacheResult<usize>;

    /// Get cache statistics
    async fn stats(&self) -> CacheResult<CacheStats>;
}
