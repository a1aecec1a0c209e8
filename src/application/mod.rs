//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and business rules. Services consume repository traits and provide
//! a clean API for HTTP handlers; workers drive the same services in the
//! background.
//!
//! # Available Services
//!
//! - [`services::url_service::UrlService`] - Slug creation, resolution, listing and stats
//! - [`services::auth_service::AuthService`] - API token authentication
//!
//! # Background Workers
//!
//! - [`workers::click_worker`] - Drains the click queue into the click store
//! - [`workers::cleanup_worker`] - Periodically purges expired mappings

pub mod services;
pub mod workers;
