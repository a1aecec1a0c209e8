//! Rate limiting middleware using token bucket algorithm.

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

use crate::utils::client_ip::client_ip;

/// Keys requests by client IP, honouring proxy headers when configured.
///
/// Uses the same resolution as click recording, so one visitor is one bucket
/// whether or not the service sits behind a reverse proxy.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    behind_proxy: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(behind_proxy: bool) -> Self {
        Self { behind_proxy }
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let ConnectInfo(peer) = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .copied()
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(client_ip(req.headers(), peer, self.behind_proxy))
    }
}

pub type RateLimitLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Creates a per-IP rate limiter.
///
/// Each client regains `per_second` requests per second (at millisecond
/// granularity), holding at most `burst`. Requests exceeding the limit receive
/// `429 Too Many Requests`.
///
/// # Panics
///
/// Panics if `burst` is zero; configuration validation
/// rejects it.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/urls", post(create_url_handler))
///     .layer(rate_limit::layer(2, 100, false));
/// ```
pub fn layer(per_second: u64, burst: u32, behind_proxy: bool) -> RateLimitLayer {
    // The builder takes the replenish interval, not a rate.
    let interval_ms = (1000 / per_second.max(1)).max(1);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(interval_ms)
            .burst_size(burst)
            .key_extractor(ClientIpKeyExtractor::new(behind_proxy))
            .finish()
            .expect("rate limit values are non-zero"),
    );

    GovernorLayer::new(governor_conf)
}
