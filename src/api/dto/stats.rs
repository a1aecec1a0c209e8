//! DTOs for click statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::ClickStats;

/// Aggregated clicks for one slug.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub slug: String,
    pub total_clicks: i64,
    pub last_click: Option<DateTime<Utc>>,
    pub unique_ips: i64,
}

impl StatsResponse {
    pub fn new(slug: String, stats: ClickStats) -> Self {
        Self {
            slug,
            total_clicks: stats.total_clicks,
            last_click: stats.last_click,
            unique_ips: stats.unique_ips,
        }
    }
}
