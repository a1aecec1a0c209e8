//! Handler for per-slug click statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns aggregated click statistics for a slug.
///
/// # Endpoint
///
/// `GET /api/v1/urls/{slug}/stats`
///
/// # Response
///
/// ```json
/// {
///   "slug": "abc123",
///   "total_clicks": 42,
///   "last_click": "2026-10-16T09:58:12Z",
///   "unique_ips": 17
/// }
/// ```
///
/// Clicks are recorded by a background worker, so a redirect shows up here
/// shortly after it happens rather than immediately.
///
/// # Errors
///
/// Returns 404 Not Found if the slug doesn't exist.
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.url_service.stats(&slug).await?;

    Ok(Json(StatsResponse::new(slug, stats)))
}
