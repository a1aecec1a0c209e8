//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx runtime
//! queries mapped through `FromRow`.
//!
//! # Repositories
//!
//! - [`PgShortUrlRepository`] - Slug mappings
//! - [`PgClickRepository`] - Click rows and aggregates
//! - [`PgTokenRepository`] - API token storage and validation

pub mod pg_click_repository;
pub mod pg_short_url_repository;
pub mod pg_token_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_short_url_repository::PgShortUrlRepository;
pub use pg_token_repository::PgTokenRepository;
