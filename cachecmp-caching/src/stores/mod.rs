//! Cache store implementations

pub mod inmemory;
pub mod lru;

pub use inmemory::InMemoryCache;
pub use lru::LruCache;
