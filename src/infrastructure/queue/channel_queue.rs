//! In-process click queue over a bounded `tokio::mpsc` channel.
//!
//! Jobs live only in memory: anything still buffered when the process dies is
//! lost.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::domain::click_event::ClickEvent;
use crate::domain::click_queue::{ClickDelivery, ClickQueue, ClickQueueConsumer, QueueError};

/// Producer half handed to the redirect handler.
#[derive(Clone)]
pub struct ChannelClickQueue {
    tx: mpsc::Sender<ClickEvent>,
    enqueue_timeout: Duration,
}

/// Consumer half driven by the click worker.
pub struct ChannelClickConsumer {
    rx: Mutex<mpsc::Receiver<ClickEvent>>,
}

/// Creates a bounded channel queue and returns both halves.
pub fn click_channel(
    capacity: usize,
    enqueue_timeout: Duration,
) -> (ChannelClickQueue, ChannelClickConsumer) {
    let (tx, rx) = mpsc::channel(capacity);

    (
        ChannelClickQueue {
            tx,
            enqueue_timeout,
        },
        ChannelClickConsumer { rx: Mutex::new(rx) },
    )
}

#[async_trait]
impl ClickQueue for ChannelClickQueue {
    async fn enqueue(&self, event: ClickEvent) -> Result<(), QueueError> {
        match self.tx.send_timeout(event, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(QueueError::Full),
            Err(SendTimeoutError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    async fn health_check(&self) -> Result<String, QueueError> {
        if self.tx.is_closed() {
            return Err(QueueError::Closed);
        }

        let capacity = self.tx.max_capacity();
        let queued = capacity - self.tx.capacity();
        Ok(format!("memory: {queued}/{capacity} queued"))
    }
}

#[async_trait]
impl ClickQueueConsumer for ChannelClickConsumer {
    async fn dequeue(&self) -> Result<Option<ClickDelivery>, QueueError> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await.map(ClickDelivery::in_process))
    }

    async fn ack(&self, _delivery: &ClickDelivery) -> Result<(), QueueError> {
        Ok(())
    }
}
