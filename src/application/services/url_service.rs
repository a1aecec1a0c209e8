//! Short URL creation, resolution and management service.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::authorization::{Action, Authorizer, Principal};
use crate::domain::entities::{ClickStats, InsertOutcome, NewShortUrl, Page, ShortUrl, is_expired};
use crate::domain::repositories::{ClickRepository, ShortUrlRepository};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheEntry, CacheService};
use crate::utils::slug_generator::{SlugGenerator, is_reserved_slug, validate_custom_slug};
use crate::utils::timeout::with_deadline;
use crate::utils::url_validator::validate_url;

/// Allowed range for `expires_in_days`.
pub const MIN_EXPIRY_DAYS: i64 = 1;
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// What to do when a non-expired mapping for the same target and owner exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateUrlPolicy {
    /// Every create gets a fresh slug.
    #[default]
    Allow,
    /// Fail with `duplicate_url`.
    Reject,
    /// Return the existing mapping.
    Reuse,
}

impl FromStr for DuplicateUrlPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            "reuse" => Ok(Self::Reuse),
            other => Err(format!(
                "unknown duplicate URL policy '{other}' (expected allow, reject or reuse)"
            )),
        }
    }
}

/// Tunables for [`UrlService`], usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct UrlServiceSettings {
    pub slug_length: usize,
    pub slug_max_attempts: u32,
    pub duplicate_policy: DuplicateUrlPolicy,
    pub pagination_max_limit: u32,
    pub cache_ttl: Duration,
    pub negative_cache_ttl: Duration,
    pub lock_ttl: Duration,
    pub lock_retry_delay: Duration,
    pub query_timeout: Duration,
}

impl Default for UrlServiceSettings {
    fn default() -> Self {
        Self {
            slug_length: 6,
            slug_max_attempts: 5,
            duplicate_policy: DuplicateUrlPolicy::Allow,
            pagination_max_limit: 100,
            cache_ttl: Duration::from_secs(3600),
            negative_cache_ttl: Duration::from_secs(5),
            lock_ttl: Duration::from_millis(3000),
            lock_retry_delay: Duration::from_millis(50),
            query_timeout: Duration::from_millis(2000),
        }
    }
}

impl From<&Config> for UrlServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            slug_length: config.slug_length,
            slug_max_attempts: config.slug_max_attempts,
            duplicate_policy: config.duplicate_url_policy,
            pagination_max_limit: config.pagination_max_limit,
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            negative_cache_ttl: Duration::from_secs(config.negative_cache_ttl_seconds),
            lock_ttl: Duration::from_millis(config.lock_ttl_ms),
            lock_retry_delay: Duration::from_millis(config.lock_retry_delay_ms),
            query_timeout: Duration::from_millis(config.db_query_timeout_ms),
        }
    }
}

/// Input for [`UrlService::create_short_url`].
#[derive(Debug, Clone, Default)]
pub struct CreateShortUrl {
    pub long_url: String,
    pub custom_slug: Option<String>,
    pub expires_in_days: Option<i64>,
    pub owner_id: Option<i64>,
}

/// A mapping together with its click count.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlDetails {
    pub url: ShortUrl,
    pub total_clicks: i64,
}

/// Service owning the slug lifecycle.
///
/// Resolution is cache-aside with a per-slug fill lock and negative caching.
/// Every repository call is bounded by `query_timeout`; every cache failure is
/// absorbed and falls back to the repository.
pub struct UrlService {
    urls: Arc<dyn ShortUrlRepository>,
    clicks: Arc<dyn ClickRepository>,
    cache: Arc<dyn CacheService>,
    slugs: Arc<dyn SlugGenerator>,
    authorizer: Arc<dyn Authorizer>,
    settings: UrlServiceSettings,
}

impl UrlService {
    /// Creates a new URL service.
    pub fn new(
        urls: Arc<dyn ShortUrlRepository>,
        clicks: Arc<dyn ClickRepository>,
        cache: Arc<dyn CacheService>,
        slugs: Arc<dyn SlugGenerator>,
        authorizer: Arc<dyn Authorizer>,
        settings: UrlServiceSettings,
    ) -> Self {
        Self {
            urls,
            clicks,
            cache,
            slugs,
            authorizer,
            settings,
        }
    }

    /// Creates a short URL.
    ///
    /// # Slug selection
    ///
    /// - With `custom_slug`: validated, then claimed with a single insert.
    ///   A taken slug fails with [`AppError::SlugTaken`]; there is no retry.
    /// - Otherwise: up to `slug_max_attempts` generated candidates are tried.
    ///   Exhaustion fails with [`AppError::SlugGenerationExhausted`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a bad URL, slug or expiry, and
    /// [`AppError::DuplicateUrl`] under the `reject` policy.
    pub async fn create_short_url(&self, input: CreateShortUrl) -> Result<ShortUrl, AppError> {
        let long_url = validate_url(&input.long_url).map_err(|e| {
            AppError::validation(
                "Invalid URL",
                json!({ "field": "long_url", "reason": e.to_string() }),
            )
        })?;

        let now = Utc::now();
        let expires_at = match input.expires_in_days {
            Some(days) if !(MIN_EXPIRY_DAYS..=MAX_EXPIRY_DAYS).contains(&days) => {
                return Err(AppError::validation(
                    format!(
                        "expires_in_days must be between {MIN_EXPIRY_DAYS} and {MAX_EXPIRY_DAYS}"
                    ),
                    json!({ "field": "expires_in_days", "provided": days }),
                ));
            }
            Some(days) => Some(now + ChronoDuration::days(days)),
            None => None,
        };

        if let Some(custom) = &input.custom_slug {
            validate_custom_slug(custom)?;
        }

        let check_duplicates = input.custom_slug.is_none()
            && self.settings.duplicate_policy != DuplicateUrlPolicy::Allow;

        if check_duplicates {
            let existing = self
                .bounded(
                    "find_active_by_long_url",
                    self.urls
                        .find_active_by_long_url(&long_url, input.owner_id, now),
                )
                .await?;

            if let Some(existing) = existing {
                match self.settings.duplicate_policy {
                    DuplicateUrlPolicy::Reuse => {
                        debug!(slug = %existing.slug, "Reusing existing mapping");
                        return Ok(existing);
                    }
                    DuplicateUrlPolicy::Reject => {
                        return Err(AppError::duplicate_url(
                            "A short URL for this target already exists",
                            json!({ "slug": existing.slug }),
                        ));
                    }
                    DuplicateUrlPolicy::Allow => {}
                }
            }
        }

        let created = match input.custom_slug {
            Some(custom) => {
                let new_url = NewShortUrl {
                    slug: custom.clone(),
                    long_url,
                    is_custom: true,
                    owner_id: input.owner_id,
                    expires_at,
                };

                match self.bounded("insert", self.urls.insert(new_url)).await? {
                    InsertOutcome::Inserted(url) => url,
                    InsertOutcome::SlugTaken => {
                        return Err(AppError::slug_taken(
                            "Slug is already taken",
                            json!({ "slug": custom }),
                        ));
                    }
                }
            }
            None => {
                self.insert_generated(long_url, input.owner_id, expires_at)
                    .await?
            }
        };

        info!(slug = %created.slug, custom = created.is_custom, "Short URL created");
        self.fill_cache(&created).await;

        Ok(created)
    }

    async fn insert_generated(
        &self,
        long_url: String,
        owner_id: Option<i64>,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<ShortUrl, AppError> {
        let attempts = self.settings.slug_max_attempts;

        for attempt in 1..=attempts {
            let slug = self.slugs.generate(self.settings.slug_length);
            if is_reserved_slug(&slug) {
                debug!(attempt, "Generated slug is reserved, retrying");
                continue;
            }

            let new_url = NewShortUrl {
                slug,
                long_url: long_url.clone(),
                is_custom: false,
                owner_id,
                expires_at,
            };

            match self.bounded("insert", self.urls.insert(new_url)).await? {
                InsertOutcome::Inserted(url) => return Ok(url),
                InsertOutcome::SlugTaken => {
                    debug!(attempt, "Generated slug collided, retrying");
                }
            }
        }

        warn!(attempts, "Slug generation exhausted");
        Err(AppError::slug_generation_exhausted(
            "Could not allocate a unique slug, try again",
            json!({ "attempts": attempts }),
        ))
    }

    /// Resolves a slug to its target URL.
    ///
    /// # Flow
    ///
    /// 1. Cache lookup. A fresh `Found` or a `Missing` entry answers directly.
    /// 2. On a miss, take the slug's fill lock, read the repository and fill
    ///    the cache (`Missing` uses the negative TTL, expired rows are not
    ///    cached).
    /// 3. If another request holds the lock, wait `lock_retry_delay`, re-check
    ///    the cache once, then read the repository without filling.
    ///
    /// Cache errors skip straight to a repository read.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] for unknown slugs
    /// - [`AppError::Expired`] for expired mappings
    /// - [`AppError::Transient`] when the repository is unavailable
    pub async fn resolve(&self, slug: &str) -> Result<String, AppError> {
        match self.cache.get(slug).await {
            Ok(Some(entry)) => {
                if let Some(answer) = cached_answer(slug, entry) {
                    metrics::counter!("cache_hits_total").increment(1);
                    return answer;
                }
                metrics::counter!("cache_misses_total").increment(1);
            }
            Ok(None) => {
                metrics::counter!("cache_misses_total").increment(1);
            }
            Err(e) => {
                metrics::counter!("cache_misses_total").increment(1);
                warn!(slug, error = %e, "Cache read failed, reading from store");
                return self.read_through(slug).await;
            }
        }

        match self.cache.acquire_lock(slug, self.settings.lock_ttl).await {
            Ok(Some(token)) => {
                let result = self.load_and_fill(slug).await;

                if let Err(e) = self.cache.release_lock(slug, &token).await {
                    debug!(slug, error = %e, "Failed to release fill lock");
                }

                result
            }
            Ok(None) => {
                debug!(slug, "Fill lock held elsewhere, waiting");
                tokio::time::sleep(self.settings.lock_retry_delay).await;

                if let Ok(Some(entry)) = self.cache.get(slug).await
                    && let Some(answer) = cached_answer(slug, entry)
                {
                    return answer;
                }

                self.read_through(slug).await
            }
            Err(e) => {
                warn!(slug, error = %e, "Fill lock unavailable, reading from store");
                self.read_through(slug).await
            }
        }
    }

    /// Reads the store and fills the cache. Caller holds the fill lock.
    async fn load_and_fill(&self, slug: &str) -> Result<String, AppError> {
        let row = self.read_row(slug).await?;

        match row {
            None => {
                self.store_cache(slug, &CacheEntry::Missing, self.settings.negative_cache_ttl)
                    .await;
                Err(not_found(slug))
            }
            Some(url) if url.is_expired() => {
                self.evict(slug).await;
                Err(expired(&url))
            }
            Some(url) => {
                self.fill_cache(&url).await;
                Ok(url.long_url)
            }
        }
    }

    /// Reads the store without touching the fill lock or populating the cache.
    async fn read_through(&self, slug: &str) -> Result<String, AppError> {
        match self.read_row(slug).await? {
            None => Err(not_found(slug)),
            Some(url) if url.is_expired() => {
                self.evict(slug).await;
                Err(expired(&url))
            }
            Some(url) => Ok(url.long_url),
        }
    }

    async fn read_row(&self, slug: &str) -> Result<Option<ShortUrl>, AppError> {
        self.bounded("find_by_slug", self.urls.find_by_slug(slug))
            .await
            .map_err(|e| {
                if e.is_transient() {
                    e
                } else {
                    warn!(slug, error = %e, "Resolution read failed");
                    AppError::transient("Store read failed", json!({ "slug": slug }))
                }
            })
    }

    /// Deletes a mapping on behalf of `caller`.
    ///
    /// The cache entry is invalidated after the delete commits, under the
    /// slug's fill lock so a fill that read the row before the delete cannot
    /// land after the eviction. A resolve racing the delete may still return
    /// the old target; resolves that start after `delete` returns do not.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the slug does not exist
    /// - [`AppError::Forbidden`] if the caller may not delete it
    pub async fn delete(&self, slug: &str, caller: &Principal) -> Result<(), AppError> {
        let url = self
            .bounded("find_by_slug", self.urls.find_by_slug(slug))
            .await?
            .ok_or_else(|| not_found(slug))?;

        if !self.authorizer.is_authorized(caller, Action::Delete, &url) {
            return Err(AppError::forbidden(
                "You are not allowed to delete this short URL",
                json!({ "slug": slug }),
            ));
        }

        let deleted = self.bounded("delete", self.urls.delete(slug)).await?;
        if !deleted {
            return Err(not_found(slug));
        }

        self.evict_under_lock(slug).await;
        info!(slug, caller = %caller.name, "Short URL deleted");

        Ok(())
    }

    /// Returns one page of mappings, newest first.
    ///
    /// `limit` is clamped to `pagination_max_limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page` or `limit` is zero.
    pub async fn list(&self, page: u32, limit: u32) -> Result<Page<ShortUrl>, AppError> {
        if page == 0 {
            return Err(AppError::validation(
                "page must be at least 1",
                json!({ "field": "page", "provided": page }),
            ));
        }
        if limit == 0 {
            return Err(AppError::validation(
                "limit must be at least 1",
                json!({ "field": "limit", "provided": limit }),
            ));
        }

        let limit = limit.min(self.settings.pagination_max_limit);
        let offset = (page as i64 - 1) * limit as i64;

        let (items, total) = tokio::try_join!(
            self.bounded("list_page", self.urls.list_page(offset, limit as i64)),
            self.bounded("count", self.urls.count()),
        )?;

        Ok(Page::new(items, total, page, limit))
    }

    /// Returns a mapping and its click count.
    pub async fn url_details(&self, slug: &str) -> Result<UrlDetails, AppError> {
        let url = self
            .bounded("find_by_slug", self.urls.find_by_slug(slug))
            .await?
            .ok_or_else(|| not_found(slug))?;

        let stats = self
            .bounded("aggregate_stats", self.clicks.aggregate_stats(slug))
            .await?;

        Ok(UrlDetails {
            url,
            total_clicks: stats.total_clicks,
        })
    }

    /// Returns click statistics for a slug.
    ///
    /// Clicks are recorded asynchronously, so the numbers trail redirects.
    pub async fn stats(&self, slug: &str) -> Result<ClickStats, AppError> {
        if self
            .bounded("find_by_slug", self.urls.find_by_slug(slug))
            .await?
            .is_none()
        {
            return Err(not_found(slug));
        }

        self.bounded("aggregate_stats", self.clicks.aggregate_stats(slug))
            .await
    }

    /// Deletes every mapping whose expiry has passed and evicts its cache entry.
    ///
    /// Returns the number of removed mappings.
    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        let purge_timeout = self.settings.query_timeout * 10;
        let slugs = self
            .with_timeout(
                "delete_expired",
                purge_timeout,
                self.urls.delete_expired(Utc::now()),
            )
            .await?;

        for slug in &slugs {
            self.evict(slug).await;
        }

        if !slugs.is_empty() {
            info!(count = slugs.len(), "Purged expired short URLs");
        }

        Ok(slugs.len())
    }

    /// Checks that the store answers within the query timeout.
    pub async fn health(&self) -> Result<(), AppError> {
        self.bounded("ping", self.urls.ping()).await
    }

    async fn fill_cache(&self, url: &ShortUrl) {
        let mut ttl = self.settings.cache_ttl;
        if let Some(expires_at) = url.expires_at
            && let Ok(remaining) = (expires_at - Utc::now()).to_std()
        {
            ttl = ttl.min(remaining);
        }

        let entry = CacheEntry::Found {
            long_url: url.long_url.clone(),
            expires_at: url.expires_at,
        };
        self.store_cache(&url.slug, &entry, ttl).await;
    }

    async fn store_cache(&self, slug: &str, entry: &CacheEntry, ttl: Duration) {
        if let Err(e) = self.cache.set(slug, entry, ttl).await {
            warn!(slug, error = %e, "Failed to write cache entry");
        }
    }

    async fn evict(&self, slug: &str) {
        if let Err(e) = self.cache.delete(slug).await {
            warn!(slug, error = %e, "Failed to invalidate cache entry");
        }
    }

    /// Evicts `slug` once no fill is in flight.
    ///
    /// Waits for the fill lock up to `lock_ttl`, after which a holder's lock
    /// has lapsed anyway. Evicts regardless when the lock is unreachable.
    async fn evict_under_lock(&self, slug: &str) {
        let deadline = tokio::time::Instant::now() + self.settings.lock_ttl;

        loop {
            match self.cache.acquire_lock(slug, self.settings.lock_ttl).await {
                Ok(Some(token)) => {
                    self.evict(slug).await;
                    if let Err(e) = self.cache.release_lock(slug, &token).await {
                        debug!(slug, error = %e, "Failed to release fill lock");
                    }
                    return;
                }
                Ok(None) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(self.settings.lock_retry_delay).await;
                }
                Ok(None) => {
                    warn!(slug, "Fill lock still held, evicting without it");
                    break;
                }
                Err(e) => {
                    debug!(slug, error = %e, "Fill lock unavailable, evicting without it");
                    break;
                }
            }
        }

        self.evict(slug).await;
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        self.with_timeout(operation, self.settings.query_timeout, fut)
            .await
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        timeout: Duration,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        with_deadline(operation, timeout, fut).await
    }
}

/// Answers from a cache entry, or `None` when the entry cannot be trusted.
fn cached_answer(slug: &str, entry: CacheEntry) -> Option<Result<String, AppError>> {
    match entry {
        CacheEntry::Found {
            long_url,
            expires_at,
        } if !is_expired(expires_at, Utc::now()) => Some(Ok(long_url)),
        CacheEntry::Found { .. } => None,
        CacheEntry::Missing => Some(Err(not_found(slug))),
    }
}

fn not_found(slug: &str) -> AppError {
    AppError::not_found("Short URL not found", json!({ "slug": slug }))
}

fn expired(url: &ShortUrl) -> AppError {
    AppError::expired(
        "Short URL has expired",
        json!({ "slug": url.slug, "expired_at": url.expires_at }),
    )
}
