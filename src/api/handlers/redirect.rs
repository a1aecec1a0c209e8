//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, header},
    response::Redirect,
};
use std::net::SocketAddr;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_queue::QueueError;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Redirects a slug to its target URL.
///
/// # Endpoint
///
/// `GET /{slug}`
///
/// # Request Flow
///
/// 1. Resolve the slug through the cache-aside path of [`crate::application::services::UrlService::resolve`]
/// 2. Enqueue a click job (bounded wait, dropped on failure)
/// 3. Return 307 Temporary Redirect
///
/// The click is never allowed to fail or noticeably delay the redirect.
///
/// # Errors
///
/// - 404 Not Found for unknown or expired slugs
/// - 503 Service Unavailable if the store cannot be reached
pub async fn redirect_handler(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Redirect, AppError> {
    let long_url = state.url_service.resolve(&slug).await?;

    let ip = client_ip(&headers, addr, state.behind_proxy);
    let event = ClickEvent::new(
        slug,
        Some(ip.to_string()),
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
        headers.get(header::REFERER).and_then(|v| v.to_str().ok()),
    );

    enqueue_click(&state, event).await;

    Ok(Redirect::temporary(&long_url))
}

async fn enqueue_click(state: &AppState, event: ClickEvent) {
    let slug = event.slug.clone();

    match state.click_queue.enqueue(event).await {
        Ok(()) => debug!(%slug, "Click queued"),
        Err(e) => {
            let reason = match e {
                QueueError::Full | QueueError::Timeout(_) => "full",
                QueueError::Closed => "closed",
                QueueError::Backend(_) | QueueError::Malformed(_) => "backend",
            };
            metrics::counter!("clicks_dropped_total", "stage" => "enqueue", "reason" => reason)
                .increment(1);
            warn!(%slug, error = %e, "Click dropped");
        }
    }
}
