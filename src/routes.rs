//! Top-level router combining public and API routes.
//!
//! # Route Structure
//!
//! - `GET  /{slug}`      - Short link redirect (public)
//! - `GET  /health`      - Health check: DB, cache, click queue (public)
//! - `/api/v1/*`         - REST API, rate limited per client IP
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket (proxy-aware when configured)
//! - **Security headers** - Hardening headers on every response
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{rate_limit, security_headers, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Per-IP request budget for the API.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_second: 2,
            burst: 100,
        }
    }
}

/// Routes and middleware without path normalization.
///
/// `state.behind_proxy` also decides whether the rate limiter keys on
/// `X-Forwarded-For` / `X-Real-IP` or on the socket peer address.
pub fn router(state: AppState, rate_limit: RateLimit) -> Router {
    let api_router = api::routes::v1_routes().layer(rate_limit::layer(
        rate_limit.per_second,
        rate_limit.burst,
        state.behind_proxy,
    ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{slug}", get(redirect_handler))
        .nest("/api/v1", api_router)
        .with_state(state);

    security_headers::apply(router).layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
///
/// Trailing slashes are trimmed before routing, so `/api/v1/urls/` and
/// `/api/v1/urls` hit the same handler.
pub fn app_router(state: AppState, rate_limit: RateLimit) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state, rate_limit))
}
