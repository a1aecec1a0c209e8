//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations; implementations live in
//! `crate::infrastructure::persistence`. Mocks are generated via `mockall` for
//! unit tests.
//!
//! # Available Repositories
//!
//! - [`ShortUrlRepository`] - Slug mappings
//! - [`ClickRepository`] - Click recording and aggregates
//! - [`TokenRepository`] - API token authentication

pub mod click_repository;
pub mod short_url_repository;
pub mod token_repository;

pub use click_repository::ClickRepository;
pub use short_url_repository::ShortUrlRepository;
pub use token_repository::{ApiToken, TokenRepository};

#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use short_url_repository::MockShortUrlRepository;
#[cfg(test)]
pub use token_repository::MockTokenRepository;
