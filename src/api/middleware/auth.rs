//! Bearer token authentication extractors.
//!
//! Handlers opt in per route: [`AuthenticatedCaller`] rejects requests without
//! a valid token, [`OptionalCaller`] accepts anonymous requests but still
//! rejects a token that is present and invalid.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::domain::authorization::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Caller authenticated from `Authorization: Bearer <token>`.
///
/// # Authentication Flow
///
/// 1. Extract token from `Authorization` header
/// 2. Hash it and look up an active token with that hash
/// 3. Update `last_used_at` (best effort)
///
/// # Errors
///
/// Rejects with `401 Unauthorized` (and `WWW-Authenticate: Bearer`) if the
/// header is missing or malformed, or the token is unknown or revoked.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller(pub Principal);

/// Caller that may be anonymous.
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<Principal>);

impl OptionalCaller {
    /// Owner id to stamp on created links.
    pub fn owner_id(&self) -> Option<i64> {
        self.0.as_ref().map(|p| p.id)
    }
}

impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthBearer(token) = AuthBearer::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                AppError::unauthorized(
                    "Unauthorized",
                    json!({"reason": "Authorization header is missing or invalid"}),
                )
            })?;

        let principal = state.auth_service.authenticate(&token).await?;

        Ok(Self(principal))
    }
}

impl FromRequestParts<AppState> for OptionalCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(Self(None));
        }

        let AuthenticatedCaller(principal) =
            AuthenticatedCaller::from_request_parts(parts, state).await?;

        Ok(Self(Some(principal)))
    }
}
