//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// `?page=&limit=` query.
///
/// Uses `serde_with` to parse numbers from query strings. Range checks and the
/// upper clamp on `limit` happen in the service.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PaginationParams {
    /// Returns `(page, limit)` with defaults applied.
    pub fn resolve(&self) -> (u32, u32) {
        (
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(PaginationParams::default().resolve(), (1, 20));
    }

    #[test]
    fn test_explicit_values() {
        let params = PaginationParams {
            page: Some(3),
            limit: Some(50),
        };
        assert_eq!(params.resolve(), (3, 50));
    }

    #[test]
    fn test_zero_is_passed_through() {
        let params = PaginationParams {
            page: Some(0),
            limit: None,
        };
        assert_eq!(params.resolve(), (0, 20));
    }
}
