//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{AuthService, UrlService};
use crate::domain::click_queue::ClickQueue;
use crate::infrastructure::cache::CacheService;

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: every field is an [`Arc`] or a small string.
#[derive(Clone)]
pub struct AppState {
    pub url_service: Arc<UrlService>,
    pub auth_service: Arc<AuthService>,
    pub click_queue: Arc<dyn ClickQueue>,
    pub cache: Arc<dyn CacheService>,
    /// Prefix for `short_url` fields, without a trailing slash.
    pub public_base_url: String,
    pub behind_proxy: bool,
}

impl AppState {
    pub fn new(
        url_service: Arc<UrlService>,
        auth_service: Arc<AuthService>,
        click_queue: Arc<dyn ClickQueue>,
        cache: Arc<dyn CacheService>,
        public_base_url: impl Into<String>,
        behind_proxy: bool,
    ) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();

        Self {
            url_service,
            auth_service,
            click_queue,
            cache,
            public_base_url,
            behind_proxy,
        }
    }

    /// Full public link for a slug.
    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/{}", self.public_base_url, slug)
    }
}
