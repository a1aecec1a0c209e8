//! Repository trait for short URL mappings.

use crate::domain::entities::{InsertOutcome, NewShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable storage for slug → target mappings.
///
/// Slug uniqueness is enforced here, by the store. Callers treat
/// [`InsertOutcome::SlugTaken`] as an expected, recoverable outcome.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Inserts a mapping in a single atomic statement.
    ///
    /// # Returns
    ///
    /// - `Ok(InsertOutcome::Inserted(url))` on success
    /// - `Ok(InsertOutcome::SlugTaken)` if the slug already exists
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transient`] or [`AppError::Internal`] on database errors.
    async fn insert(&self, new_url: NewShortUrl) -> Result<InsertOutcome, AppError>;

    /// Finds a mapping by slug, expired or not.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds the newest non-expired mapping of `long_url` created by `owner_id`.
    ///
    /// `owner_id = None` matches anonymous mappings only.
    async fn find_active_by_long_url(
        &self,
        long_url: &str,
        owner_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, AppError>;

    /// Deletes a mapping. Clicks are removed by the store's cascade.
    ///
    /// Returns `Ok(false)` if nothing matched.
    async fn delete(&self, slug: &str) -> Result<bool, AppError>;

    /// Lists mappings ordered by `created_at DESC, slug DESC`.
    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<ShortUrl>, AppError>;

    /// Counts all stored mappings, including expired ones.
    async fn count(&self) -> Result<i64, AppError>;

    /// Deletes every mapping with `expires_at < before` and returns the removed slugs.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<Vec<String>, AppError>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}
