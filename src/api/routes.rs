//! API route configuration.
//!
//! Authentication is per handler through the extractors in
//! [`crate::api::middleware::auth`].

use crate::api::handlers::{
    create_url_handler, delete_url_handler, get_url_handler, list_urls_handler, stats_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes mounted under `/api/v1`.
///
/// # Endpoints
///
/// - `POST   /urls`               - Create a short URL (token optional)
/// - `GET    /urls`               - List short URLs, paginated (token required)
/// - `GET    /urls/{slug}`        - Short URL details with click count
/// - `DELETE /urls/{slug}`        - Delete a short URL (token required)
/// - `GET    /urls/{slug}/stats`  - Aggregated click statistics
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/urls", post(create_url_handler).get(list_urls_handler))
        .route(
            "/urls/{slug}",
            get(get_url_handler).delete(delete_url_handler),
        )
        .route("/urls/{slug}/stats", get(stats_handler))
}
