//! Repository trait for click analytics.

use crate::domain::entities::{Click, ClickStats, NewClick};
use crate::error::AppError;
use async_trait::async_trait;

/// Storage for recorded clicks and their aggregates.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Persists one click.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the slug no longer exists.
    /// Returns [`AppError::Transient`] if the database is unreachable.
    async fn insert_click(&self, click: NewClick) -> Result<Click, AppError>;

    /// Aggregates total clicks, last click time and distinct non-null IPs for a slug.
    async fn aggregate_stats(&self, slug: &str) -> Result<ClickStats, AppError>;
}
