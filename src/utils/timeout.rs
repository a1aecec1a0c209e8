//! Deadline for store calls.

use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::AppError;

/// Runs `fut` with a deadline. An elapsed deadline is a transient error, so
/// callers that retry transient failures retry timeouts too.
pub async fn with_deadline<T>(
    operation: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Store call timed out"
            );
            Err(AppError::transient(
                "Store call timed out",
                json!({ "operation": operation }),
            ))
        }
    }
}
