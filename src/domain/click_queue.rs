//! Work-queue contract for click analytics.
//!
//! The producer side ([`ClickQueue`]) is used by the redirect handler; the
//! consumer side ([`ClickQueueConsumer`]) is driven by
//! [`crate::application::workers::click_worker`]. Delivery is at-least-once for
//! durable backends: a job is removed only after [`ClickQueueConsumer::ack`].

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::click_event::ClickEvent;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("click queue is full")]
    Full,

    #[error("click queue is closed")]
    Closed,

    #[error("click queue operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("click queue backend error: {0}")]
    Backend(String),

    #[error("malformed click job: {0}")]
    Malformed(String),
}

/// A dequeued job plus whatever the backend needs to acknowledge it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickDelivery {
    pub event: ClickEvent,
    /// Raw payload for list-based backends; `None` for in-process channels.
    pub receipt: Option<String>,
}

impl ClickDelivery {
    pub fn in_process(event: ClickEvent) -> Self {
        Self {
            event,
            receipt: None,
        }
    }
}

/// Producer side of the click queue.
///
/// Implementations bound every enqueue with a timeout; callers log and drop
/// on error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickQueue: Send + Sync {
    async fn enqueue(&self, event: ClickEvent) -> Result<(), QueueError>;

    /// Short human-readable status for the health endpoint.
    async fn health_check(&self) -> Result<String, QueueError>;
}

/// Consumer side of the click queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickQueueConsumer: Send + Sync {
    /// Waits for the next job.
    ///
    /// Returns `Ok(None)` once the queue is closed and drained.
    async fn dequeue(&self) -> Result<Option<ClickDelivery>, QueueError>;

    /// Marks a job as finished so it is not redelivered.
    async fn ack(&self, delivery: &ClickDelivery) -> Result<(), QueueError>;
}
