//! Durable click queue on Redis lists.
//!
//! Jobs are pushed onto `queue:clicks` and atomically moved to
//! `queue:clicks:processing` when taken. A job leaves the processing list only
//! when acked, so a crash between dequeue and ack leaves it there; the next
//! consumer start moves it back for redelivery.

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult, aio::ConnectionManager};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::click_queue::{ClickDelivery, ClickQueue, ClickQueueConsumer, QueueError};

const QUEUE_KEY: &str = "queue:clicks";
const PROCESSING_KEY: &str = "queue:clicks:processing";

async fn bounded<T>(
    op_timeout: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T, QueueError> {
    match tokio::time::timeout(op_timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.is_timeout() => Err(QueueError::Timeout(op_timeout)),
        Ok(Err(e)) => Err(QueueError::Backend(e.to_string())),
        Err(_) => Err(QueueError::Timeout(op_timeout)),
    }
}

fn encode_job(event: &ClickEvent) -> Result<String, QueueError> {
    serde_json::to_string(event).map_err(|e| QueueError::Malformed(e.to_string()))
}

fn decode_job(raw: &str) -> Result<ClickEvent, QueueError> {
    serde_json::from_str(raw).map_err(|e| QueueError::Malformed(e.to_string()))
}

/// Producer half: `LPUSH` bounded by the enqueue timeout.
#[derive(Clone)]
pub struct RedisClickQueue {
    conn: ConnectionManager,
    enqueue_timeout: Duration,
}

impl RedisClickQueue {
    pub fn new(conn: ConnectionManager, enqueue_timeout: Duration) -> Self {
        Self {
            conn,
            enqueue_timeout,
        }
    }
}

#[async_trait]
impl ClickQueue for RedisClickQueue {
    async fn enqueue(&self, event: ClickEvent) -> Result<(), QueueError> {
        let payload = encode_job(&event)?;
        let mut conn = self.conn.clone();

        let _: i64 = bounded(self.enqueue_timeout, conn.lpush(QUEUE_KEY, payload)).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<String, QueueError> {
        let mut conn = self.conn.clone();
        let pending: i64 = bounded(self.enqueue_timeout, conn.llen(QUEUE_KEY)).await?;
        let mut conn = self.conn.clone();
        let in_flight: i64 = bounded(self.enqueue_timeout, conn.llen(PROCESSING_KEY)).await?;

        Ok(format!("redis: {pending} pending, {in_flight} in flight"))
    }
}

/// Consumer half: non-blocking `LMOVE` polled at a fixed interval.
pub struct RedisClickConsumer {
    conn: ConnectionManager,
    poll_interval: Duration,
    op_timeout: Duration,
}

impl RedisClickConsumer {
    /// Creates the consumer and requeues jobs left in the processing list by a
    /// previous run.
    pub async fn start(
        conn: ConnectionManager,
        poll_interval: Duration,
        op_timeout: Duration,
    ) -> Result<Self, QueueError> {
        let consumer = Self {
            conn,
            poll_interval,
            op_timeout,
        };

        let recovered = consumer.requeue_in_flight().await?;
        if recovered > 0 {
            info!(recovered, "Requeued unacknowledged click jobs");
        }

        Ok(consumer)
    }

    /// Moves every processing entry back to the head of the queue, oldest last
    /// in so it is taken first.
    async fn requeue_in_flight(&self) -> Result<usize, QueueError> {
        let mut moved = 0;

        loop {
            let mut conn = self.conn.clone();
            let mut cmd = redis::cmd("LMOVE");
            cmd.arg(PROCESSING_KEY).arg(QUEUE_KEY).arg("LEFT").arg("RIGHT");

            let job: Option<String> = bounded(self.op_timeout, cmd.query_async(&mut conn)).await?;
            if job.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }

    async fn discard(&self, raw: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = bounded(self.op_timeout, conn.lrem(PROCESSING_KEY, 1, raw)).await?;
        Ok(())
    }
}

#[async_trait]
impl ClickQueueConsumer for RedisClickConsumer {
    async fn dequeue(&self) -> Result<Option<ClickDelivery>, QueueError> {
        loop {
            let mut conn = self.conn.clone();
            let mut cmd = redis::cmd("LMOVE");
            cmd.arg(QUEUE_KEY).arg(PROCESSING_KEY).arg("RIGHT").arg("LEFT");

            let raw: Option<String> = bounded(self.op_timeout, cmd.query_async(&mut conn)).await?;

            let Some(raw) = raw else {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            return match decode_job(&raw) {
                Ok(event) => Ok(Some(ClickDelivery {
                    event,
                    receipt: Some(raw),
                })),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed click job");
                    self.discard(&raw).await?;
                    Err(e)
                }
            };
        }
    }

    async fn ack(&self, delivery: &ClickDelivery) -> Result<(), QueueError> {
        match &delivery.receipt {
            Some(raw) => self.discard(raw).await,
            None => Ok(()),
        }
    }
}
