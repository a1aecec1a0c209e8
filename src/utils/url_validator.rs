//! Target URL validation.
//!
//! Targets are stored exactly as submitted (after trimming surrounding
//! whitespace) so a redirect returns the URL the caller gave us byte-for-byte.
//! Validation only decides whether the input is an acceptable redirect target.

use url::Url;

/// Longest target accepted, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

/// Reasons a target URL is rejected.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UrlValidationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("URL exceeds {MAX_URL_LENGTH} characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,
}

/// Validates a redirect target and returns the trimmed input.
///
/// # Rules
///
/// 1. **Protocol**: only `http` and `https`
/// 2. **Host**: must be present
/// 3. **Length**: at most [`MAX_URL_LENGTH`] bytes
///
/// Rejects potentially dangerous schemes like `javascript:`, `data:` and `file:`.
pub fn validate_url(input: &str) -> Result<String, UrlValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlValidationError::UnsupportedProtocol),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(trimmed.to_string())
}
