//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: `SELECT 1` within the query timeout
/// 2. **Cache**: backend ping (always ok for in-process and disabled caches)
/// 3. **Click Queue**: backend status and depth
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let (database, cache, click_queue) = tokio::join!(
        check_database(&state),
        check_cache(&state),
        check_click_queue(&state)
    );

    let all_healthy = database.is_ok() && cache.is_ok() && click_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            click_queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.url_service.health().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    let backend = state.cache.backend();

    if state.cache.health_check().await {
        CheckStatus::ok(format!("Backend: {backend}"))
    } else {
        CheckStatus::error(format!("Backend {backend} unreachable"))
    }
}

async fn check_click_queue(state: &AppState) -> CheckStatus {
    match state.click_queue.health_check().await {
        Ok(status) => CheckStatus::ok(status),
        Err(e) => CheckStatus::error(e.to_string()),
    }
}
