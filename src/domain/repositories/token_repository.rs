//! Repository trait for API token authentication.

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// API token entity with metadata.
///
/// Only the HMAC-SHA256 hash of the raw token is stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ApiToken {
    pub id: i64,
    pub name: String,
    pub token_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Repository interface for API token management.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgTokenRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Finds a non-revoked token by its hash.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))` if the hash matches an active token
    /// - `Ok(None)` if the token is unknown or revoked
    async fn find_active_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, AppError>;

    /// Updates the `last_used_at` timestamp for a token.
    async fn update_last_used(&self, token_id: i64) -> Result<(), AppError>;

    /// Creates a new API token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the name or hash already exists.
    async fn create_token(
        &self,
        name: &str,
        token_hash: &str,
        is_admin: bool,
    ) -> Result<ApiToken, AppError>;

    /// Lists all tokens, newest first.
    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ApiToken>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError>;

    /// Revokes a token by setting `revoked_at`.
    async fn revoke_token(&self, id: i64) -> Result<(), AppError>;
}
