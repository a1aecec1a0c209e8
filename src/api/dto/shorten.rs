//! DTOs for the short URL creation endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::entities::ShortUrl;
use crate::utils::url_validator::MAX_URL_LENGTH;

/// Request to create one short URL.
///
/// Field-level checks here only reject obviously bad input early; the service
/// applies the full URL, slug and expiry rules.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// Redirect target. Must be an absolute HTTP(S) URL.
    #[validate(
        length(min = 1, message = "long_url must not be empty"),
        custom(function = "validate_long_url_length")
    )]
    pub long_url: String,

    /// Optional caller-chosen slug.
    #[validate(length(min = 1, message = "custom_slug must not be empty"))]
    pub custom_slug: Option<String>,

    /// Lifetime in days; the link never expires when omitted.
    pub expires_in_days: Option<i64>,
}

fn validate_long_url_length(long_url: &str) -> Result<(), ValidationError> {
    if long_url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::new("too_long")
            .with_message(format!("long_url must be at most {MAX_URL_LENGTH} characters").into()));
    }
    Ok(())
}

/// Created short URL.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub slug: String,
    pub short_url: String,
    pub long_url: String,
    pub is_custom: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShortenResponse {
    pub fn new(url: ShortUrl, short_url: String) -> Self {
        Self {
            slug: url.slug,
            short_url,
            long_url: url.long_url,
            is_custom: url.is_custom,
            expires_at: url.expires_at,
            created_at: url.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_is_valid() {
        let req: ShortenRequest =
            serde_json::from_str(r#"{"long_url": "https://example.com"}"#).unwrap();

        assert!(req.validate().is_ok());
        assert!(req.custom_slug.is_none());
        assert!(req.expires_in_days.is_none());
    }

    #[test]
    fn test_empty_long_url_is_invalid() {
        let req: ShortenRequest = serde_json::from_str(r#"{"long_url": ""}"#).unwrap();

        let errors = req.validate().unwrap_err();
        let field = errors.field_errors()["long_url"];
        assert_eq!(field[0].code, "length");
        assert_eq!(
            field[0].message.as_deref(),
            Some("long_url must not be empty")
        );
    }

    #[test]
    fn test_oversized_long_url_is_invalid() {
        let req = ShortenRequest {
            long_url: format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH)),
            custom_slug: None,
            expires_in_days: None,
        };

        let errors = req.validate().unwrap_err();
        let field = errors.field_errors()["long_url"];
        assert_eq!(field.len(), 1);
        assert_eq!(field[0].code, "too_long");
        assert_eq!(
            field[0].message.as_deref(),
            Some("long_url must be at most 2048 characters")
        );
    }

    #[test]
    fn test_long_url_at_limit_is_valid() {
        let path = "a".repeat(MAX_URL_LENGTH - "https://example.com/".len());
        let req = ShortenRequest {
            long_url: format!("https://example.com/{path}"),
            custom_slug: None,
            expires_in_days: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_missing_long_url_fails_to_parse() {
        assert!(serde_json::from_str::<ShortenRequest>(r#"{"custom_slug": "abc"}"#).is_err());
    }
}
