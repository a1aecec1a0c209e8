//! Click entity representing a single redirect event.

use chrono::{DateTime, Utc};

/// A recorded redirect, enriched off the hot path.
///
/// `clicked_at` is the time the redirect happened, not the time the worker
/// processed it. Enrichment fields stay `None` when lookups fail.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Click {
    pub id: i64,
    pub slug: String,
    pub clicked_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
}

/// Derived attributes attached to a click by the analytics worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickEnrichment {
    pub country: Option<String>,
    pub city: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
}

/// Input data for recording a click.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClick {
    pub slug: String,
    pub clicked_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub enrichment: ClickEnrichment,
}

/// Aggregated click statistics for one slug.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickStats {
    pub total_clicks: i64,
    pub last_click: Option<DateTime<Utc>>,
    pub unique_ips: i64,
}
