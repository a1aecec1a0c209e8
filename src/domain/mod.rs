//! Domain layer containing business entities and contracts.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click job payload
//! - [`click_queue`] - Producer/consumer contract for click jobs
//! - [`authorization`] - Caller identity and the authorization predicate
//! - [`enrichment`] - Best-effort click enrichment contract
//!
//! The domain layer has no dependencies on infrastructure or presentation layers.
//!
//! # Click Processing Flow
//!
//! 1. The redirect handler builds a [`click_event::ClickEvent`]
//! 2. It is enqueued through [`click_queue::ClickQueue`] with a bounded timeout
//! 3. [`crate::application::workers::click_worker`] dequeues, enriches and persists it
//! 4. The job is acknowledged once the click is stored or permanently rejected

pub mod authorization;
pub mod click_event;
pub mod click_queue;
pub mod enrichment;
pub mod entities;
pub mod repositories;
