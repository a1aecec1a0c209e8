//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache and queue selection, worker spawning,
//! and the Axum server lifecycle including graceful shutdown.

use crate::application::services::{AuthService, UrlService, UrlServiceSettings};
use crate::application::workers::{ClickProcessor, run_cleanup_worker, run_click_worker};
use crate::config::{ClickQueueBackend, Config};
use crate::domain::authorization::OwnershipPolicy;
use crate::domain::click_queue::{ClickQueue, ClickQueueConsumer};
use crate::infrastructure::cache::{
    CacheService, MemoryCache, NullCache, RedisCache, connect_manager,
};
use crate::infrastructure::enrichment::{DefaultClickEnricher, GeoIpService};
use crate::infrastructure::persistence::{
    PgClickRepository, PgShortUrlRepository, PgTokenRepository,
};
use crate::infrastructure::queue::{RedisClickConsumer, RedisClickQueue, click_channel};
use crate::routes::{RateLimit, app_router};
use crate::shutdown;
use crate::state::AppState;
use crate::utils::slug_generator::RandomSlugGenerator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Cache (Redis, in-process, or `NullCache` when Redis is unreachable)
/// - Click queue (in-process channel or Redis list)
/// - Click worker and expired-URL cleanup worker
/// - Axum HTTP server
///
/// On Ctrl+C / SIGTERM the server stops accepting connections, workers are
/// cancelled and awaited, and the pool is closed.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The Redis click queue is configured but unreachable
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = build_cache(&config).await;
    let (click_queue, click_consumer) = build_click_queue(&config).await?;

    let pool_arc = Arc::new(pool.clone());
    let url_repository = Arc::new(PgShortUrlRepository::new(pool_arc.clone()));
    let click_repository = Arc::new(PgClickRepository::new(pool_arc.clone()));
    let token_repository = Arc::new(PgTokenRepository::new(pool_arc));

    let url_service = Arc::new(UrlService::new(
        url_repository,
        click_repository.clone(),
        cache.clone(),
        Arc::new(RandomSlugGenerator),
        Arc::new(OwnershipPolicy),
        UrlServiceSettings::from(&config),
    ));
    let query_timeout = Duration::from_millis(config.db_query_timeout_ms);
    let auth_service = Arc::new(
        AuthService::new(token_repository, config.token_signing_secret.clone())
            .with_query_timeout(query_timeout),
    );

    let enricher = Arc::new(DefaultClickEnricher::new(open_geoip(&config)));
    let processor = Arc::new(
        ClickProcessor::new(click_repository, enricher).with_insert_timeout(query_timeout),
    );

    let shutdown_token = CancellationToken::new();
    let click_worker = tokio::spawn(run_click_worker(
        click_consumer,
        processor,
        config.click_worker_concurrency,
        shutdown_token.clone(),
    ));
    let cleanup_worker = tokio::spawn(run_cleanup_worker(
        url_service.clone(),
        Duration::from_secs(config.cleanup_interval_seconds),
        shutdown_token.clone(),
    ));

    let state = AppState::new(
        url_service,
        auth_service,
        click_queue,
        cache,
        config.public_base_url.clone(),
        config.behind_proxy,
    );

    let app = app_router(
        state,
        RateLimit {
            per_second: config.rate_limit_per_second,
            burst: config.rate_limit_burst,
        },
    );

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    let signal_token = shutdown_token.clone();
    let served = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(async move {
        shutdown::signal().await;
        signal_token.cancel();
    })
    .await;

    // Also reached when serving fails, so workers never outlive the server.
    shutdown_token.cancel();
    for (name, handle) in [("click", click_worker), ("cleanup", cleanup_worker)] {
        if let Err(e) = handle.await {
            tracing::error!(worker = name, error = %e, "Worker task panicked");
        }
    }

    pool.close().await;
    tracing::info!("Shutdown complete");

    served.context("HTTP server error")
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    let op_timeout = Duration::from_millis(config.cache_timeout_ms);

    match &config.redis_url {
        Some(redis_url) => match RedisCache::connect(redis_url, op_timeout).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        },
        None => {
            tracing::info!("Cache enabled (in-process)");
            Arc::new(MemoryCache::new())
        }
    }
}

async fn build_click_queue(
    config: &Config,
) -> Result<(Arc<dyn ClickQueue>, Arc<dyn ClickQueueConsumer>)> {
    let enqueue_timeout = Duration::from_millis(config.queue_enqueue_timeout_ms);

    match (config.click_queue_backend, &config.redis_url) {
        (ClickQueueBackend::Redis, Some(redis_url)) => {
            let manager = connect_manager(redis_url)
                .await
                .context("Failed to connect to Redis for the click queue")?;

            let consumer = RedisClickConsumer::start(
                manager.clone(),
                Duration::from_millis(config.click_queue_poll_interval_ms),
                Duration::from_millis(config.cache_timeout_ms),
            )
            .await
            .context("Failed to start Redis click consumer")?;

            tracing::info!("Click queue: Redis list");
            Ok((
                Arc::new(RedisClickQueue::new(manager, enqueue_timeout)),
                Arc::new(consumer),
            ))
        }
        (ClickQueueBackend::Redis, None) => {
            anyhow::bail!("CLICK_QUEUE_BACKEND=redis requires a Redis URL")
        }
        (ClickQueueBackend::Memory, _) => {
            let (queue, consumer) = click_channel(config.click_queue_capacity, enqueue_timeout);

            tracing::info!(
                capacity = config.click_queue_capacity,
                "Click queue: in-process channel"
            );
            Ok((Arc::new(queue), Arc::new(consumer)))
        }
    }
}

fn open_geoip(config: &Config) -> Option<GeoIpService> {
    let path = config.geoip_db_path.as_deref()?;

    match GeoIpService::open(path) {
        Ok(geoip) => {
            tracing::info!(path, "GeoIP enrichment enabled");
            Some(geoip)
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "GeoIP database unavailable, enrichment disabled");
            None
        }
    }
}
