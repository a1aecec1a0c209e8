//! Application error type and its HTTP representation.
//!
//! Every variant carries a human-readable `message` and a JSON `details` payload.
//! Responses use a single envelope:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Short URL not found", "details": { "slug": "abc" } } }
//! ```

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// Error taxonomy shared by services, repositories and handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed user input (URL, slug, pagination, expiry).
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Unknown slug or missing record.
    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// The record exists but its `expires_at` has passed. Rendered as 404.
    #[error("{message}")]
    Expired { message: String, details: Value },

    /// A custom slug is already claimed.
    #[error("{message}")]
    SlugTaken { message: String, details: Value },

    /// The owner already has a live short URL for this target.
    #[error("{message}")]
    DuplicateUrl { message: String, details: Value },

    /// Every generated candidate collided.
    #[error("{message}")]
    SlugGenerationExhausted { message: String, details: Value },

    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    #[error("{message}")]
    Forbidden { message: String, details: Value },

    /// Backend timeout or unavailability. Retryable by the client.
    #[error("{message}")]
    Transient { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn expired(message: impl Into<String>, details: Value) -> Self {
        Self::Expired {
            message: message.into(),
            details,
        }
    }

    pub fn slug_taken(message: impl Into<String>, details: Value) -> Self {
        Self::SlugTaken {
            message: message.into(),
            details,
        }
    }

    pub fn duplicate_url(message: impl Into<String>, details: Value) -> Self {
        Self::DuplicateUrl {
            message: message.into(),
            details,
        }
    }

    pub fn slug_generation_exhausted(message: impl Into<String>, details: Value) -> Self {
        Self::SlugGenerationExhausted {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }

    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }

    pub fn transient(message: impl Into<String>, details: Value) -> Self {
        Self::Transient {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable machine-readable code used in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Expired { .. } => "expired",
            Self::SlugTaken { .. } => "slug_taken",
            Self::DuplicateUrl { .. } => "duplicate_url",
            Self::SlugGenerationExhausted { .. } => "slug_generation_exhausted",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Transient { .. } => "temporarily_unavailable",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } | Self::Expired { .. } => StatusCode::NOT_FOUND,
            Self::SlugTaken { .. } | Self::DuplicateUrl { .. } => StatusCode::CONFLICT,
            Self::SlugGenerationExhausted { .. } | Self::Transient { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for errors the caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            // Backend detail never leaves the process.
            AppError::Transient { message, details } => {
                tracing::warn!(%message, %details, "transient backend failure");
                (
                    "Service temporarily unavailable".to_string(),
                    json!({}),
                )
            }
            AppError::Internal { message, details } => {
                tracing::error!(%message, %details, "internal error");
                ("Internal server error".to_string(), json!({}))
            }
            AppError::Validation { message, details }
            | AppError::NotFound { message, details }
            | AppError::Expired { message, details }
            | AppError::SlugTaken { message, details }
            | AppError::DuplicateUrl { message, details }
            | AppError::SlugGenerationExhausted { message, details }
            | AppError::Unauthorized { message, details }
            | AppError::Forbidden { message, details } => (message, details),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found", json!({})),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::transient("Database unavailable", json!({ "reason": e.to_string() }))
            }
            _ => AppError::internal("Database error", json!({ "reason": e.to_string() })),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: serde_json::Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();

        AppError::validation("Request validation failed", json!({ "fields": fields }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("bad", json!({})).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::expired("gone", json!({})).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::slug_taken("taken", json!({})).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::slug_generation_exhausted("full", json!({})).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::transient("down", json!({})).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::forbidden("no", json!({})).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let response = AppError::unauthorized("Unauthorized", json!({})).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_display_uses_message() {
        let err = AppError::not_found("Short URL not found", json!({"slug": "abc"}));
        assert_eq!(err.to_string(), "Short URL not found");
        assert_eq!(err.code(), "not_found");
    }
}
