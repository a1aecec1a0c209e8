//! Long-running background tasks spawned by [`crate::server::run`].

pub mod cleanup_worker;
pub mod click_worker;

pub use cleanup_worker::run_cleanup_worker;
pub use click_worker::{ClickOutcome, ClickProcessor, run_click_worker};
