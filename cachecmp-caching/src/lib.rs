//! Response cache stores for the cachecmp reference proxy
//!
//! The proxy consumes a [`ResponseCache`] handle. Two stores back it: an
//! unlimited in-memory map that never evicts, and a bounded LRU store used to
//! provoke evictions on purpose.

pub mod cache;
pub mod config;
pub mod errors;
pub mod response_cache;
pub mod stats;
pub mod stores;

// Re-export main types
pub use cache::{Cache, CacheKey, CacheValue};
pub use config::ResponseCacheConfig;
pub use errors::{CacheError, CacheResult};
pub use response_cache::{CachedResponse, ResponseCache, ResponseKey};
pub use stats::CacheStats;

// Re-export store implementations
pub use stores::{InMemoryCache, LruCache};
