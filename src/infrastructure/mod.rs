//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching, queuing and click
//! enrichment.
//!
//! # Modules
//!
//! - [`cache`] - Resolution cache (Redis, in-memory and no-op implementations)
//! - [`enrichment`] - GeoIP and user-agent enrichment
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`queue`] - Click queue backends (in-process channel and Redis list)

pub mod cache;
pub mod enrichment;
pub mod persistence;
pub mod queue;
