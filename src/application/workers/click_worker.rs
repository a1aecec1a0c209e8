//! Background worker that turns queued click jobs into stored clicks.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_queue::{ClickQueueConsumer, QueueError};
use crate::domain::entities::NewClick;
use crate::domain::enrichment::ClickEnricher;
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;
use crate::utils::timeout::with_deadline;

/// Pause after a failed dequeue before asking the backend again.
const DEQUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Recorded,
    /// The slug was deleted before the click could be stored.
    SlugGone,
    /// A permanent error, or retries ran out.
    Failed,
}

/// Enriches and stores one click, retrying transient store failures.
pub struct ClickProcessor {
    clicks: Arc<dyn ClickRepository>,
    enricher: Arc<dyn ClickEnricher>,
    retry_base: Duration,
    max_retries: usize,
    insert_timeout: Duration,
}

impl ClickProcessor {
    pub fn new(clicks: Arc<dyn ClickRepository>, enricher: Arc<dyn ClickEnricher>) -> Self {
        Self {
            clicks,
            enricher,
            retry_base: Duration::from_millis(50),
            max_retries: 3,
            insert_timeout: Duration::from_millis(2000),
        }
    }

    /// Bounds each insert attempt. A timed-out attempt is retried like any
    /// other transient failure.
    pub fn with_insert_timeout(mut self, timeout: Duration) -> Self {
        self.insert_timeout = timeout;
        self
    }

    /// Overrides the backoff base delay and retry count.
    pub fn with_retry(mut self, base: Duration, max_retries: usize) -> Self {
        self.retry_base = base;
        self.max_retries = max_retries;
        self
    }

    pub async fn process(&self, event: &ClickEvent) -> ClickOutcome {
        let new_click = NewClick {
            slug: event.slug.clone(),
            clicked_at: event.timestamp,
            ip_address: event.ip.clone(),
            user_agent: event.user_agent.clone(),
            referer: event.referer.clone(),
            enrichment: self.enricher.enrich(event),
        };

        // Delays: base, 2*base, 4*base, ... with jitter, capped at 5s.
        let strategy = ExponentialBackoff::from_millis(2)
            .factor((self.retry_base.as_millis() as u64 / 2).max(1))
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries);

        let result = RetryIf::spawn(
            strategy,
            || {
                with_deadline(
                    "insert_click",
                    self.insert_timeout,
                    self.clicks.insert_click(new_click.clone()),
                )
            },
            |e: &AppError| e.is_transient(),
        )
        .await;

        match result {
            Ok(click) => {
                metrics::counter!("clicks_recorded_total").increment(1);
                debug!(slug = %click.slug, click_id = click.id, "Click recorded");
                ClickOutcome::Recorded
            }
            Err(AppError::NotFound { .. }) => {
                debug!(slug = %event.slug, "Slug deleted before click was stored");
                ClickOutcome::SlugGone
            }
            Err(e) => {
                metrics::counter!("clicks_dropped_total", "stage" => "worker").increment(1);
                warn!(slug = %event.slug, error = %e, "Failed to record click");
                ClickOutcome::Failed
            }
        }
    }
}

/// Consumes click jobs until the queue closes or `shutdown` fires.
///
/// At most `concurrency` jobs run at once. Each job is acked once processing
/// finishes, whatever the outcome. On shutdown no new jobs are taken and
/// in-flight jobs are awaited.
pub async fn run_click_worker(
    consumer: Arc<dyn ClickQueueConsumer>,
    processor: Arc<ClickProcessor>,
    concurrency: usize,
    shutdown: CancellationToken,
) {
    let concurrency = concurrency.max(1);
    let permits = Arc::new(Semaphore::new(concurrency));
    info!(concurrency, "Click worker started");

    loop {
        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = consumer.dequeue() => next,
        };

        let delivery = match next {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                info!("Click queue closed");
                break;
            }
            Err(QueueError::Malformed(_)) => continue,
            Err(e) => {
                warn!(error = %e, "Failed to dequeue click job");
                drop(permit);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(DEQUEUE_ERROR_BACKOFF) => continue,
                }
            }
        };

        let consumer = Arc::clone(&consumer);
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            let _permit = permit;
            processor.process(&delivery.event).await;

            if let Err(e) = consumer.ack(&delivery).await {
                warn!(slug = %delivery.event.slug, error = %e, "Failed to ack click job");
            }
        });
    }

    // Every permit back means every spawned job has finished.
    let _ = permits.acquire_many(concurrency as u32).await;
    info!("Click worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Click, ClickEnrichment, ClickStats};
    use crate::domain::enrichment::MockClickEnricher;
    use crate::domain::repositories::MockClickRepository;
    use crate::infrastructure::queue::click_channel;
    use crate::domain::click_queue::ClickQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(slug: &str) -> ClickEvent {
        ClickEvent::new(
            slug.to_string(),
            Some("203.0.113.9".to_string()),
            Some("Mozilla/5.0"),
            Some("https://news.example.com"),
        )
    }

    fn stored(click: NewClick) -> Click {
        Click {
            id: 1,
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
        }
    }

    fn enricher() -> MockClickEnricher {
        let mut enricher = MockClickEnricher::new();
        enricher.expect_enrich().returning(|_| ClickEnrichment {
            country: Some("Germany".to_string()),
            browser: Some("Firefox".to_string()),
            ..Default::default()
        });
        enricher
    }

    fn processor(clicks: MockClickRepository) -> ClickProcessor {
        ClickProcessor::new(Arc::new(clicks), Arc::new(enricher()))
            .with_retry(Duration::from_millis(1), 3)
    }

    #[tokio::test]
    async fn test_process_stores_event_time_and_enrichment() {
        let event = event("abc123");
        let expected_time = event.timestamp;

        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert_click()
            .withf(move |c| {
                c.slug == "abc123"
                    && c.clicked_at == expected_time
                    && c.ip_address.as_deref() == Some("203.0.113.9")
                    && c.enrichment.country.as_deref() == Some("Germany")
                    && c.enrichment.browser.as_deref() == Some("Firefox")
            })
            .times(1)
            .returning(|c| Ok(stored(c)));

        assert_eq!(
            processor(clicks).process(&event).await,
            ClickOutcome::Recorded
        );
    }

    #[tokio::test]
    async fn test_process_retries_transient_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let mut clicks = MockClickRepository::new();
        clicks.expect_insert_click().returning(move |c| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::transient("pool timed out", serde_json::Value::Null))
            } else {
                Ok(stored(c))
            }
        });

        let outcome = processor(clicks).process(&event("abc123")).await;

        assert_eq!(outcome, ClickOutcome::Recorded);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_process_gives_up_after_retries() {
        let mut clicks = MockClickRepository::new();
        clicks
            .expect_insert_click()
            .times(4)
            .returning(|_| Err(AppError::transient("down", serde_json::Value::Null)));

        let outcome = processor(clicks).process(&event("abc123")).await;

        assert_eq!(outcome, ClickOutcome::Failed);
    }

    #[tokio::test]
    async fn test_process_does_not_retry_deleted_slug() {
        let mut clicks = MockClickRepository::new();
        clicks.expect_insert_click().times(1).returning(|_| {
            Err(AppError::not_found(
                "Short URL no longer exists",
                serde_json::Value::Null,
            ))
        });

        let outcome = processor(clicks).process(&event("gone12")).await;

        assert_eq!(outcome, ClickOutcome::SlugGone);
    }

    struct StalledClickRepository {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ClickRepository for StalledClickRepository {
        async fn insert_click(&self, _click: NewClick) -> Result<Click, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        async fn aggregate_stats(&self, _slug: &str) -> Result<ClickStats, AppError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_process_bounds_stalled_inserts() {
        let clicks = Arc::new(StalledClickRepository {
            calls: AtomicUsize::new(0),
        });
        let processor = ClickProcessor::new(clicks.clone(), Arc::new(enricher()))
            .with_retry(Duration::from_millis(1), 2)
            .with_insert_timeout(Duration::from_millis(20));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            processor.process(&event("slow01")),
        )
        .await
        .expect("stalled insert should time out");

        assert_eq!(outcome, ClickOutcome::Failed);
        assert_eq!(clicks.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_worker_drains_queue_until_closed() {
        let inserted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&inserted);

        let mut clicks = MockClickRepository::new();
        clicks.expect_insert_click().returning(move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(stored(c))
        });

        let (queue, consumer) = click_channel(16, Duration::from_millis(10));
        for slug in ["a1", "b2", "c3", "d4", "e5"] {
            queue.enqueue(event(slug)).await.unwrap();
        }
        drop(queue);

        run_click_worker(
            Arc::new(consumer),
            Arc::new(processor(clicks)),
            2,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(inserted.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (_queue, consumer) = click_channel(16, Duration::from_millis(10));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_click_worker(
            Arc::new(consumer),
            Arc::new(processor(MockClickRepository::new())),
            4,
            shutdown.clone(),
        ));

        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}
