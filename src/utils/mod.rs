//! Utility functions used across the application.
//!
//! - [`slug_generator`] - Slug generation and custom-slug validation
//! - [`url_validator`] - Redirect target validation
//! - [`client_ip`] - Client IP resolution (peer or trusted proxy headers)
//! - [`db_error`] - Database constraint violation helpers
//! - [`timeout`] - Deadlines for store calls

pub mod client_ip;
pub mod db_error;
pub mod slug_generator;
pub mod timeout;
pub mod url_validator;
