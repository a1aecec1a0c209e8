//! Caching layer for fast redirect lookups.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`RedisCache`] - Shared Redis cache with distributed fill locks
//! - [`MemoryCache`] - In-process cache used when Redis is not configured
//! - [`NullCache`] - No-op fallback when Redis is configured but unreachable

mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::{RedisCache, connect_manager};
pub use service::{CacheEntry, CacheError, CacheResult, CacheService, LockToken};

#[cfg(test)]
pub use service::MockCacheService;
