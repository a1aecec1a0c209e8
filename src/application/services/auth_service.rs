//! Authentication service for API token validation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::authorization::Principal;
use crate::domain::repositories::{ApiToken, TokenRepository};
use crate::error::AppError;
use crate::utils::timeout::with_deadline;
use serde_json::json;

type HmacSha256 = Hmac<Sha256>;

/// Hashes a raw token with HMAC-SHA256 keyed by `signing_secret`.
///
/// Returns a 64-character lowercase hex-encoded MAC. Shared with the admin CLI
/// so tokens it issues verify against the server.
pub fn hash_token(signing_secret: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Service for authenticating API requests via Bearer tokens.
///
/// Tokens are hashed with HMAC-SHA256 (keyed by `signing_secret`) before storage
/// and comparison. An attacker with read-only access to the database cannot verify
/// or forge tokens without the server-side secret.
pub struct AuthService {
    repository: Arc<dyn TokenRepository>,
    signing_secret: String,
    query_timeout: Duration,
}

impl AuthService {
    /// Creates a new authentication service.
    ///
    /// # Arguments
    ///
    /// - `repository` - token repository for DB operations
    /// - `signing_secret` - HMAC key; must match the value used when tokens were created
    pub fn new(repository: Arc<dyn TokenRepository>, signing_secret: String) -> Self {
        Self {
            repository,
            signing_secret,
            query_timeout: Duration::from_millis(2000),
        }
    }

    /// Bounds each token lookup and `last_used_at` update.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Authenticates a raw token and returns the caller it belongs to.
    ///
    /// On success the token's `last_used_at` is refreshed; a failure to do so
    /// does not fail the request.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unauthorized`] if the token is unknown or revoked
    /// - [`AppError::Transient`] if the lookup fails or exceeds the query timeout
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let token_hash = hash_token(&self.signing_secret, token);

        let lookup = self.repository.find_active_by_hash(&token_hash);
        let Some(api_token) = with_deadline("find_active_by_hash", self.query_timeout, lookup).await?
        else {
            return Err(AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Invalid or revoked token"}),
            ));
        };

        let touch = self.repository.update_last_used(api_token.id);
        if let Err(e) = with_deadline("update_last_used", self.query_timeout, touch).await {
            debug!(token_id = api_token.id, error = %e, "Failed to update last_used_at");
        }

        Ok(Principal {
            id: api_token.id,
            name: api_token.name,
            is_admin: api_token.is_admin,
        })
    }

    /// Stores a new token under `name`. Only the hash of `raw_token` is kept.
    pub async fn create_token(
        &self,
        name: &str,
        raw_token: &str,
        is_admin: bool,
    ) -> Result<ApiToken, AppError> {
        let token_hash = hash_token(&self.signing_secret, raw_token);
        self.repository
            .create_token(name, &token_hash, is_admin)
            .await
    }
}
