//! Client IP resolution for click recording and rate limiting.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Returns the originating client IP.
///
/// When `behind_proxy` is set, the first valid address in `X-Forwarded-For`
/// wins, then `X-Real-IP`. Otherwise (or if neither header parses) the socket
/// peer address is used. Only enable proxy headers behind a trusted proxy:
/// clients can set them freely.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy && let Some(ip) = forwarded_ip(headers) {
        return ip;
    }

    peer.ip()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    from_forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
