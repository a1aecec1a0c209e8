//! In-process cache for single-node deployments.

use super::service::{CacheEntry, CacheResult, CacheService, LockToken};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Sharded in-memory cache with per-entry expiry.
///
/// Locks are held in a separate map with the same compare-and-delete release
/// semantics as [`super::RedisCache`]. An expired entry is evicted when its key
/// is read, and every expired entry and lock is swept at most once per sweep
/// interval by whichever call comes first after the interval passes.
pub struct MemoryCache {
    entries: DashMap<String, (CacheEntry, Instant)>,
    locks: DashMap<String, (LockToken, Instant)>,
    started: Instant,
    /// Milliseconds after `started` when the next sweep is due.
    next_sweep_ms: AtomicU64,
    sweep_interval: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            started: Instant::now(),
            next_sweep_ms: AtomicU64::new(sweep_interval.as_millis() as u64),
            sweep_interval,
        }
    }

    /// Number of stored entries, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry and lock. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();

        self.entries.retain(|_, (_, deadline)| *deadline > now);
        self.locks.retain(|_, (_, deadline)| *deadline > now);

        before.saturating_sub(self.entries.len())
    }

    /// Sweeps when the interval has passed. Only one caller wins each interval.
    ///
    /// Must not be called while holding a reference into either map.
    fn sweep_if_due(&self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let due_ms = self.next_sweep_ms.load(Ordering::Relaxed);
        if elapsed_ms < due_ms {
            return;
        }

        let next_ms = elapsed_ms + self.sweep_interval.as_millis() as u64;
        if self
            .next_sweep_ms
            .compare_exchange(due_ms, next_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired();
        }
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, slug: &str) -> CacheResult<Option<CacheEntry>> {
        self.sweep_if_due();
        let now = Instant::now();

        if let Some(item) = self.entries.get(slug) {
            let (entry, deadline) = item.value();
            if *deadline > now {
                return Ok(Some(entry.clone()));
            }
        }

        self.entries.remove_if(slug, |_, (_, deadline)| *deadline <= now);
        Ok(None)
    }

    async fn set(&self, slug: &str, entry: &CacheEntry, ttl: Duration) -> CacheResult<()> {
        self.sweep_if_due();
        self.entries
            .insert(slug.to_string(), (entry.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, slug: &str) -> CacheResult<()> {
        self.entries.remove(slug);
        Ok(())
    }

    async fn acquire_lock(&self, slug: &str, ttl: Duration) -> CacheResult<Option<LockToken>> {
        self.sweep_if_due();
        let now = Instant::now();
        let token = LockToken::random();

        let mut slot = self
            .locks
            .entry(slug.to_string())
            .or_insert_with(|| (token.clone(), now + ttl));

        let (holder, deadline) = slot.value_mut();
        if *holder == token {
            return Ok(Some(token));
        }

        if *deadline <= now {
            *holder = token.clone();
            *deadline = now + ttl;
            return Ok(Some(token));
        }

        Ok(None)
    }

    async fn release_lock(&self, slug: &str, token: &LockToken) -> CacheResult<()> {
        self.locks.remove_if(slug, |_, (holder, _)| holder == token);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
