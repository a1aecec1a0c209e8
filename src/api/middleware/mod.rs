//! HTTP middleware for request processing and protection.
//!
//! - [`auth`] - Bearer token extractors
//! - [`rate_limit`] - Per-IP token bucket
//! - [`security_headers`] - Hardening response headers
//! - [`tracing`] - Request/response logging

pub mod auth;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;

pub use auth::{AuthenticatedCaller, OptionalCaller};
