//! Cache service trait, entry format and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors that can occur during cache operations.
///
/// Every variant means "the cache is unavailable for this call". Callers fall
/// back to the repository; none of these reach an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache operation error: {0}")]
    Operation(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cached resolution state for one slug.
///
/// Stored as JSON: `{"kind":"found","long_url":"...","expires_at":null}` or
/// `{"kind":"missing"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEntry {
    Found {
        long_url: String,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Negative entry: the slug was absent from the store when last checked.
    Missing,
}

/// Proof of holding a slug's fill lock. Required to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(pub String);

impl LockToken {
    /// Creates a random 128-bit token.
    pub fn random() -> Self {
        Self(hex::encode(rand::random::<[u8; 16]>()))
    }
}

/// Slug → resolution cache with a per-slug fill lock.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed, shared across instances
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process, for single-node deployments
/// - [`crate::infrastructure::cache::NullCache`] - Always misses
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Looks up a slug. `Ok(None)` is a miss.
    async fn get(&self, slug: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores an entry for `ttl`.
    async fn set(&self, slug: &str, entry: &CacheEntry, ttl: Duration) -> CacheResult<()>;

    /// Removes the entry for a slug, if any.
    async fn delete(&self, slug: &str) -> CacheResult<()>;

    /// Tries to take the slug's fill lock for `ttl`.
    ///
    /// Returns `Ok(None)` if another resolver holds it.
    async fn acquire_lock(&self, slug: &str, ttl: Duration) -> CacheResult<Option<LockToken>>;

    /// Releases the lock only if `token` still owns it.
    async fn release_lock(&self, slug: &str, token: &LockToken) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;

    /// Backend name for health reporting.
    fn backend(&self) -> &'static str;
}
