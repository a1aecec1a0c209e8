//! DTOs describing stored short URLs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::services::UrlDetails;
use crate::domain::entities::{Page, ShortUrl};

/// One entry of the listing endpoint.
#[derive(Debug, Serialize)]
pub struct UrlListItem {
    pub slug: String,
    pub short_url: String,
    pub long_url: String,
    pub is_custom: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UrlListItem {
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

/// Paginated listing response.
#[derive(Debug, Serialize)]
pub struct UrlListResponse {
    pub items: Vec<UrlListItem>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: u32,
}

impl UrlListResponse {
    /// Builds the response, turning each slug into a public link with `link`.
    pub fn from_page(page: Page<ShortUrl>, link: impl Fn(&str) -> String) -> Self {
        let items = page
            .items
            .into_iter()
            .map(|url| {
                let short_url = link(&url.slug);
                UrlListItem::new(url, short_url)
            })
            .collect();

        Self {
            items,
            page: page.page,
            limit: page.limit,
            total: page.total,
            pages: page.pages,
        }
    }
}

/// Details of a single short URL.
#[derive(Debug, Serialize)]
pub struct UrlInfoResponse {
    pub slug: String,
    pub short_url: String,
    pub long_url: String,
    pub is_custom: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub click_count: i64,
}

impl UrlInfoResponse {
    pub fn new(details: UrlDetails, short_url: String) -> Self {
        let UrlDetails { url, total_clicks } = details;

        Self {
            slug: url.slug,
            short_url,
            long_url: url.long_url,
            is_custom: url.is_custom,
            expires_at: url.expires_at,
            created_at: url.created_at,
            updated_at: url.updated_at,
            click_count: total_clicks,
        }
    }
}

/// Confirmation returned by the delete endpoint.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}
