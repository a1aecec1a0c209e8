//! Slug generation and custom-slug validation.
//!
//! Generated slugs are drawn uniformly from `[A-Za-z0-9]`. Uniqueness is not
//! checked here; [`crate::application::services::UrlService`] retries on
//! collision against the store.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde_json::json;

use crate::error::AppError;

/// Case-sensitive alphanumeric alphabet (62 symbols).
pub const SLUG_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const MIN_SLUG_LENGTH: usize = 4;
pub const MAX_SLUG_LENGTH: usize = 32;

/// Slugs that would shadow service routes.
const RESERVED_SLUGS: &[&str] = &["api", "health", "admin", "static", "docs", "metrics"];

static CUSTOM_SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("custom slug pattern is a valid regex")
});

/// Produces candidate slugs of a requested length.
///
/// A trait so tests can inject deterministic or deliberately colliding generators.
#[cfg_attr(test, mockall::automock)]
pub trait SlugGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Generator backed by the thread-local CSPRNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSlugGenerator;

impl SlugGenerator for RandomSlugGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();

        (0..length)
            .map(|_| SLUG_ALPHABET[rng.random_range(0..SLUG_ALPHABET.len())] as char)
            .collect()
    }
}

/// Returns `true` for slugs that collide with service routes (case-insensitive).
pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(slug))
}

/// Validates a caller-chosen slug.
///
/// # Rules
///
/// - Length: 4-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot start or end with a hyphen
/// - Cannot be a reserved route name (case-insensitive)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_custom_slug(slug: &str) -> Result<(), AppError> {
    if !(MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&slug.len()) {
        return Err(AppError::validation(
            format!("Custom slug must be {MIN_SLUG_LENGTH}-{MAX_SLUG_LENGTH} characters"),
            json!({ "field": "custom_slug", "provided_length": slug.len() }),
        ));
    }

    if !CUSTOM_SLUG_PATTERN.is_match(slug) {
        return Err(AppError::validation(
            "Custom slug can only contain letters, digits, hyphens and underscores",
            json!({ "field": "custom_slug", "slug": slug }),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(AppError::validation(
            "Custom slug cannot start or end with a hyphen",
            json!({ "field": "custom_slug", "slug": slug }),
        ));
    }

    if is_reserved_slug(slug) {
        return Err(AppError::validation(
            "This slug is reserved",
            json!({ "field": "custom_slug", "slug": slug }),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_has_requested_length() {
        let generator = RandomSlugGenerator;
        assert_eq!(generator.generate(6).len(), 6);
        assert_eq!(generator.generate(12).len(), 12);
    }

    #[test]
    fn test_generate_uses_alphanumeric_alphabet() {
        let slug = RandomSlugGenerator.generate(64);
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_produces_distinct_slugs() {
        let generator = RandomSlugGenerator;
        let slugs: HashSet<String> = (0..1000).map(|_| generator.generate(8)).collect();
        assert_eq!(slugs.len(), 1000);
    }

    #[test]
    fn test_generated_slugs_pass_custom_validation() {
        for _ in 0..100 {
            let slug = RandomSlugGenerator.generate(6);
            if is_reserved_slug(&slug) {
                continue;
            }
            assert!(validate_custom_slug(&slug).is_ok(), "{slug}");
        }
    }

    #[test]
    fn test_validate_accepts_valid_slugs() {
        assert!(validate_custom_slug("mylink").is_ok());
        assert!(validate_custom_slug("Promo_2025").is_ok());
        assert!(validate_custom_slug("my-link-2024").is_ok());
        assert!(validate_custom_slug("abcd").is_ok());
        assert!(validate_custom_slug(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn test_validate_rejects_length() {
        assert!(validate_custom_slug("abc").is_err());
        assert!(validate_custom_slug(&"a".repeat(33)).is_err());
        assert!(validate_custom_slug("").is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_characters() {
        assert!(validate_custom_slug("my link").is_err());
        assert!(validate_custom_slug("my/link").is_err());
        assert!(validate_custom_slug("link?x=1").is_err());
        assert!(validate_custom_slug("cafés").is_err());
    }

    #[test]
    fn test_validate_rejects_edge_hyphens() {
        assert!(validate_custom_slug("-mylink").is_err());
        assert!(validate_custom_slug("mylink-").is_err());
    }

    #[test]
    fn test_validate_rejects_reserved() {
        assert!(validate_custom_slug("health").is_err());
        assert!(validate_custom_slug("ADMIN").is_err());
        assert!(validate_custom_slug("static").is_err());
    }

    #[test]
    fn test_validation_error_kind() {
        let err = validate_custom_slug("ab").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
