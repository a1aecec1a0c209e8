//! Click job payload carried from the redirect path to the analytics worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A "record a click" job.
///
/// Serialized as JSON when the durable Redis queue backend is used.
/// `timestamp` is captured in the redirect handler so the stored
/// `clicked_at` reflects event time even when the queue lags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub slug: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ClickEvent {
    /// Creates a click event stamped with the current time.
    ///
    /// ```ignore
    /// let event = ClickEvent::new(
    ///     "abc123".to_string(),
    ///     Some("192.168.1.1".to_string()),
    ///     Some("Mozilla/5.0"),
    ///     Some("https://google.com"),
    /// );
    /// ```
    pub fn new(
        slug: String,
        ip: Option<String>,
        user_agent: Option<&str>,
        referer: Option<&str>,
    ) -> Self {
        Self {
            slug,
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referer: referer.map(|s| s.to_string()),
            timestamp: Utc::now(),
        }
    }
}
