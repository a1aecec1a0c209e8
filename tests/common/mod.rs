#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use quicklink::application::services::{
    AuthService, UrlService, UrlServiceSettings, hash_token,
};
use quicklink::application::workers::{ClickProcessor, run_click_worker};
use quicklink::domain::authorization::OwnershipPolicy;
use quicklink::domain::entities::{
    Click, ClickStats, InsertOutcome, NewClick, NewShortUrl, ShortUrl,
};
use quicklink::domain::repositories::{
    ApiToken, ClickRepository, ShortUrlRepository, TokenRepository,
};
use quicklink::error::AppError;
use quicklink::infrastructure::cache::{
    CacheEntry, CacheError, CacheResult, CacheService, LockToken, MemoryCache,
};
use quicklink::infrastructure::enrichment::DefaultClickEnricher;
use quicklink::infrastructure::queue::click_channel;
use quicklink::routes::{RateLimit, router};
use quicklink::state::AppState;
use quicklink::utils::slug_generator::{RandomSlugGenerator, SlugGenerator};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Layer;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const BASE_URL: &str = "https://sho.rt";

/// Inserts `ConnectInfo` so handlers and the rate limiter see a peer address.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Short URLs and clicks in one place, so click inserts can check the slug
/// exists the way the foreign key does.
#[derive(Default)]
pub struct InMemoryStore {
    urls: Mutex<HashMap<String, ShortUrl>>,
    clicks: Mutex<Vec<Click>>,
    next_click_id: AtomicI64,
    /// When set, every call fails with a transient error.
    pub unavailable: AtomicBool,
    /// Number of `find_by_slug` calls served.
    pub find_calls: AtomicUsize,
    /// Artificial latency for `find_by_slug`, in milliseconds.
    pub read_delay_ms: AtomicU64,
}

impl InMemoryStore {
    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::transient("store offline", json!({})));
        }
        Ok(())
    }

    /// Inserts a row directly, bypassing the service.
    pub fn seed(&self, slug: &str, long_url: &str, expires_at: Option<DateTime<Utc>>) {
        let now = Utc::now();
        self.urls.lock().unwrap().insert(
            slug.to_string(),
            ShortUrl {
                slug: slug.to_string(),
                long_url: long_url.to_string(),
                is_custom: true,
                owner_id: None,
                created_at: now,
                updated_at: now,
                expires_at,
            },
        );
    }

    pub fn get(&self, slug: &str) -> Option<ShortUrl> {
        self.urls.lock().unwrap().get(slug).cloned()
    }

    pub fn url_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn clicks_for(&self, slug: &str) -> Vec<Click> {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.slug == slug)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ShortUrlRepository for InMemoryStore {
    async fn insert(&self, new_url: NewShortUrl) -> Result<InsertOutcome, AppError> {
        self.check_available()?;
        let mut urls = self.urls.lock().unwrap();

        if urls.contains_key(&new_url.slug) {
            return Ok(InsertOutcome::SlugTaken);
        }

        let now = Utc::now();
        let url = ShortUrl {
            slug: new_url.slug,
            long_url: new_url.long_url,
            is_custom: new_url.is_custom,
            owner_id: new_url.owner_id,
            created_at: now,
            updated_at: now,
            expires_at: new_url.expires_at,
        };
        urls.insert(url.slug.clone(), url.clone());

        Ok(InsertOutcome::Inserted(url))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortUrl>, AppError> {
        self.check_available()?;
        self.find_calls.fetch_add(1, Ordering::SeqCst);

        // Snapshot first so the delay models a read that started before a
        // concurrent write.
        let row = self.get(slug);
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        Ok(row)
    }

    async fn find_active_by_long_url(
        &self,
        long_url: &str,
        owner_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, AppError> {
        self.check_available()?;
        Ok(self
            .urls
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.long_url == long_url && u.owner_id == owner_id && !u.is_expired_at(now))
            .max_by_key(|u| u.created_at)
            .cloned())
    }

    async fn delete(&self, slug: &str) -> Result<bool, AppError> {
        self.check_available()?;
        let removed = self.urls.lock().unwrap().remove(slug).is_some();
        if removed {
            self.clicks.lock().unwrap().retain(|c| c.slug != slug);
        }
        Ok(removed)
    }

    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        self.check_available()?;
        let mut all: Vec<ShortUrl> = self.urls.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.slug.cmp(&a.slug))
        });

        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        self.check_available()?;
        Ok(self.urls.lock().unwrap().len() as i64)
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        self.check_available()?;
        let mut urls = self.urls.lock().unwrap();
        let expired: Vec<String> = urls
            .values()
            .filter(|u| u.expires_at.is_some_and(|at| at < before))
            .map(|u| u.slug.clone())
            .collect();

        for slug in &expired {
            urls.remove(slug);
        }

        Ok(expired)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

#[async_trait]
impl ClickRepository for InMemoryStore {
    async fn insert_click(&self, click: NewClick) -> Result<Click, AppError> {
        self.check_available()?;

        if !self.urls.lock().unwrap().contains_key(&click.slug) {
            return Err(AppError::not_found(
                "Short URL no longer exists",
                json!({ "slug": click.slug }),
            ));
        }

        let stored = Click {
            id: self.next_click_id.fetch_add(1, Ordering::SeqCst) + 1,
            slug: click.slug,
            clicked_at: click.clicked_at,
            ip_address: click.ip_address,
            user_agent: click.user_agent,
            referer: click.referer,
            country: click.enrichment.country,
            city: click.enrichment.city,
            browser: click.enrichment.browser,
            os: click.enrichment.os,
            device: click.enrichment.device,
        };
        self.clicks.lock().unwrap().push(stored.clone());

        Ok(stored)
    }

    async fn aggregate_stats(&self, slug: &str) -> Result<ClickStats, AppError> {
        self.check_available()?;
        let clicks = self.clicks_for(slug);

        let unique_ips: HashSet<&str> = clicks
            .iter()
            .filter_map(|c| c.ip_address.as_deref())
            .collect();

        Ok(ClickStats {
            total_clicks: clicks.len() as i64,
            last_click: clicks.iter().map(|c| c.clicked_at).max(),
            unique_ips: unique_ips.len() as i64,
        })
    }
}

#[derive(Default)]
pub struct InMemoryTokenRepository {
    tokens: Mutex<Vec<ApiToken>>,
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn find_active_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token_hash == token_hash && t.revoked_at.is_none())
            .cloned())
    }

    async fn update_last_used(&self, token_id: i64) -> Result<(), AppError> {
        if let Some(token) = self
            .tokens
            .lock()
            .unwrap()
            .iter_mut()
            .find(|t| t.id == token_id)
        {
            token.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_token(
        &self,
        name: &str,
        token_hash: &str,
        is_admin: bool,
    ) -> Result<ApiToken, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let token = ApiToken {
            id: tokens.len() as i64 + 1,
            name: name.to_string(),
            token_hash: token_hash.to_string(),
            is_admin,
            created_at: Utc::now(),
            last_used_at: None,
            revoked_at: None,
        };
        tokens.push(token.clone());
        Ok(token)
    }

    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError> {
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn revoke_token(&self, id: i64) -> Result<(), AppError> {
        if let Some(token) = self.tokens.lock().unwrap().iter_mut().find(|t| t.id == id) {
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Cache whose every operation fails, like an unreachable Redis.
pub struct FailingCache;

#[async_trait]
impl CacheService for FailingCache {
    async fn get(&self, _slug: &str) -> CacheResult<Option<CacheEntry>> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn set(&self, _slug: &str, _entry: &CacheEntry, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn delete(&self, _slug: &str) -> CacheResult<()> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn acquire_lock(&self, _slug: &str, _ttl: Duration) -> CacheResult<Option<LockToken>> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn release_lock(&self, _slug: &str, _token: &LockToken) -> CacheResult<()> {
        Err(CacheError::Connection("refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Emits every candidate twice, so concurrent creates keep colliding.
#[derive(Default)]
pub struct CollidingSlugGenerator {
    calls: AtomicUsize,
}

impl SlugGenerator for CollidingSlugGenerator {
    fn generate(&self, _length: usize) -> String {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        format!("c{:05}", n / 2)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub tokens: Arc<InMemoryTokenRepository>,
    pub shutdown: CancellationToken,
}

impl TestApp {
    /// Stores a token and returns its raw value.
    pub async fn token(&self, name: &str, is_admin: bool) -> String {
        let raw = format!("raw-{name}");
        self.tokens
            .create_token(name, &hash_token(SIGNING_SECRET, &raw), is_admin)
            .await
            .unwrap();
        raw
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub struct TestAppBuilder {
    cache: Arc<dyn CacheService>,
    slugs: Arc<dyn SlugGenerator>,
    settings: UrlServiceSettings,
    rate_limit: RateLimit,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            cache: Arc::new(MemoryCache::new()),
            slugs: Arc::new(RandomSlugGenerator),
            settings: UrlServiceSettings {
                lock_retry_delay: Duration::from_millis(5),
                ..UrlServiceSettings::default()
            },
            rate_limit: RateLimit {
                per_second: 1000,
                burst: 10_000,
            },
        }
    }
}

impl TestAppBuilder {
    pub fn cache(mut self, cache: Arc<dyn CacheService>) -> Self {
        self.cache = cache;
        self
    }

    pub fn slugs(mut self, slugs: Arc<dyn SlugGenerator>) -> Self {
        self.slugs = slugs;
        self
    }

    pub fn settings(mut self, settings: UrlServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn rate_limit(mut self, per_second: u64, burst: u32) -> Self {
        self.rate_limit = RateLimit { per_second, burst };
        self
    }

    /// Builds the full router over in-memory backends and starts a click worker.
    pub fn build(self) -> TestApp {
        let store = Arc::new(InMemoryStore::default());
        let tokens = Arc::new(InMemoryTokenRepository::default());

        let url_service = Arc::new(UrlService::new(
            store.clone(),
            store.clone(),
            self.cache.clone(),
            self.slugs,
            Arc::new(OwnershipPolicy),
            self.settings,
        ));
        let auth_service = Arc::new(AuthService::new(
            tokens.clone(),
            SIGNING_SECRET.to_string(),
        ));

        let (queue, consumer) = click_channel(1000, Duration::from_millis(50));
        let processor = Arc::new(
            ClickProcessor::new(store.clone(), Arc::new(DefaultClickEnricher::default()))
                .with_retry(Duration::from_millis(1), 2),
        );
        let shutdown = CancellationToken::new();
        tokio::spawn(run_click_worker(
            Arc::new(consumer),
            processor,
            2,
            shutdown.clone(),
        ));

        let state = AppState::new(
            url_service,
            auth_service,
            Arc::new(queue),
            self.cache,
            BASE_URL,
            false,
        );

        let app = router(state, self.rate_limit).layer(MockConnectInfoLayer);
        let server = TestServer::new(app).unwrap();

        TestApp {
            server,
            store,
            tokens,
            shutdown,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

/// Polls `check` until it returns true or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
