//! Periodic removal of expired short URLs.
//!
//! Resolution already refuses expired mappings on read; this job only keeps
//! the table and cache from accumulating them.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::services::UrlService;

/// Calls [`UrlService::purge_expired`] every `every` until `shutdown` fires.
///
/// The first pass runs immediately.
pub async fn run_cleanup_worker(
    service: Arc<UrlService>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = every.as_secs(), "Cleanup worker started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match service.purge_expired().await {
                Ok(0) => debug!("No expired short URLs"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Expired URL cleanup failed"),
            },
        }
    }

    info!("Cleanup worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::UrlServiceSettings;
    use crate::domain::authorization::OwnershipPolicy;
    use crate::domain::repositories::{MockClickRepository, MockShortUrlRepository};
    use crate::infrastructure::cache::MockCacheService;
    use crate::utils::slug_generator::MockSlugGenerator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_cleanup_runs_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let mut urls = MockShortUrlRepository::new();
        urls.expect_delete_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["old123".to_string()])
        });

        let mut cache = MockCacheService::new();
        cache.expect_delete().returning(|_| Ok(()));

        let service = Arc::new(UrlService::new(
            Arc::new(urls),
            Arc::new(MockClickRepository::new()),
            Arc::new(cache),
            Arc::new(MockSlugGenerator::new()),
            Arc::new(OwnershipPolicy),
            UrlServiceSettings::default(),
        ));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_cleanup_worker(
            service,
            Duration::from_millis(10),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(35)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
