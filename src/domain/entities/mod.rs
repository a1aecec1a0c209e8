//! Core domain entities.
//!
//! Entities are plain data structures. Creation inputs live next to the entity
//! they produce (`NewShortUrl`, `NewClick`).
//!
//! - [`ShortUrl`] - a slug → target mapping
//! - [`Click`] - a recorded redirect with optional enrichment
//! - [`ClickStats`] - per-slug aggregates
//! - [`Page`] - ordered listing page

pub mod click;
pub mod short_url;

pub use click::{Click, ClickEnrichment, ClickStats, NewClick};
pub use short_url::{InsertOutcome, NewShortUrl, Page, ShortUrl, is_expired};
