//! Handlers for short URL management: create, list, inspect, delete.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::api::dto::url_info::{DeleteResponse, UrlInfoResponse, UrlListResponse};
use crate::api::middleware::{AuthenticatedCaller, OptionalCaller};
use crate::application::services::CreateShortUrl;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/v1/urls`
///
/// A bearer token is optional; when present, the token becomes the link's
/// owner and may later delete it.
///
/// # Request Body
///
/// ```json
/// {
///   "long_url": "https://example.com/some/long/path",
///   "custom_slug": "mylink",     // optional
///   "expires_in_days": 30        // optional, 1-365
/// }
/// ```
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "slug": "mylink",
///   "short_url": "https://sho.rt/mylink",
///   "long_url": "https://example.com/some/long/path",
///   "is_custom": true,
///   "expires_at": "2026-11-15T10:00:00Z",
///   "created_at": "2026-10-16T10:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - 400 for an invalid URL, slug or expiry
/// - 409 if the custom slug is taken, or the target already has a link under
///   the `reject` duplicate policy
/// - 503 if no free slug was found or the store is unavailable
pub async fn create_url_handler(
    State(state): State<AppState>,
    caller: OptionalCaller,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let Json(payload) = payload.map_err(|e| {
        AppError::validation("Invalid request body", json!({ "reason": e.body_text() }))
    })?;
    payload.validate()?;

    let url = state
        .url_service
        .create_short_url(CreateShortUrl {
            long_url: payload.long_url,
            custom_slug: payload.custom_slug,
            expires_in_days: payload.expires_in_days,
            owner_id: caller.owner_id(),
        })
        .await?;

    let short_url = state.short_url(&url.slug);

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse::new(url, short_url)),
    ))
}

/// Lists short URLs, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/urls?page=1&limit=20` (bearer token required)
///
/// `limit` above the configured maximum is clamped rather than rejected.
pub async fn list_urls_handler(
    State(state): State<AppState>,
    _caller: AuthenticatedCaller,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Json<UrlListResponse>, AppError> {
    let Query(params) = params.map_err(|e| {
        AppError::validation(
            "Invalid pagination parameters",
            json!({ "reason": e.body_text() }),
        )
    })?;
    let (page, limit) = params.resolve();

    let page = state.url_service.list(page, limit).await?;

    Ok(Json(UrlListResponse::from_page(page, |slug| {
        state.short_url(slug)
    })))
}

/// Returns one short URL with its click count.
///
/// # Endpoint
///
/// `GET /api/v1/urls/{slug}`
///
/// Expired links are still returned here until the cleanup job removes them.
pub async fn get_url_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<UrlInfoResponse>, AppError> {
    let details = state.url_service.url_details(&slug).await?;
    let short_url = state.short_url(&details.url.slug);

    Ok(Json(UrlInfoResponse::new(details, short_url)))
}

/// Deletes a short URL.
///
/// # Endpoint
///
/// `DELETE /api/v1/urls/{slug}` (bearer token required)
///
/// Admin tokens may delete any link; other tokens only links they created.
///
/// # Errors
///
/// - 401 without a valid token
/// - 403 if the caller does not own the link
/// - 404 if the slug does not exist
pub async fn delete_url_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<Json<DeleteResponse>, AppError> {
    state.url_service.delete(&slug, &caller).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Short URL '{slug}' deleted"),
    }))
}
