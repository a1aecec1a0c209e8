//! No-op cache implementation for disabled caching.

use super::service::{CacheEntry, CacheResult, CacheService, LockToken};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A cache that stores nothing.
///
/// Used as the fallback when Redis is configured but unreachable at startup.
/// Every lookup misses and every lock is granted, so resolution reads the
/// repository directly without waiting on contention.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _slug: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(None)
    }

    async fn set(&self, _slug: &str, _entry: &CacheEntry, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _slug: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn acquire_lock(&self, _slug: &str, _ttl: Duration) -> CacheResult<Option<LockToken>> {
        Ok(Some(LockToken::random()))
    }

    async fn release_lock(&self, _slug: &str, _token: &LockToken) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}
