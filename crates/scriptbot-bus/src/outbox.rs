//! Retrying publisher.
//!
//! By default the engine publishes after the participant state is committed
//! and a failed publish loses the batch while the state has already
//! advanced. [`OutboxPublisher`] closes part of that gap: every batch is
//! queued first and the queue is drained in order, so a failed publish is
//! retried by the next publish or by [`OutboxPublisher::flush`] instead of
//! being dropped. The queue lives in memory; batches still queued when the
//! process dies are lost.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::envelope::Envelope;
use crate::error::BusError;
use crate::transport::Publisher;

/// Publisher that queues envelopes and retries failed deliveries in order.
pub struct OutboxPublisher {
    inner: Arc<dyn Publisher>,
    queue: Mutex<VecDeque<Envelope>>,
}

impl OutboxPublisher {
    /// Wraps `inner` with an in-memory outbox.
    #[must_use]
    pub fn new(inner: Arc<dyn Publisher>) -> Self {
        Self {
            inner,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of envelopes waiting for delivery.
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Retries everything still queued. Returns the number of envelopes left
    /// in the queue.
    pub async fn flush(&self) -> usize {
        let mut queue = self.queue.lock().await;
        self.drain(&mut queue).await;
        queue.len()
    }

    async fn drain(&self, queue: &mut VecDeque<Envelope>) {
        if queue.is_empty() {
            return;
        }
        let batch: Vec<Envelope> = queue.iter().cloned().collect();
        match self.inner.publish(batch).await {
            Ok(()) => queue.clear(),
            Err(e) => {
                tracing::warn!(error = %e, pending = queue.len(), "outbox publish failed, will retry");
            }
        }
    }
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError> {
        let mut queue = self.queue.lock().await;
        queue.extend(batch);
        self.drain(&mut queue).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::envelope::OutboundMessage;
    use uuid::Uuid;

    /// Fails while `down` is set, records successful batches otherwise.
    #[derive(Default)]
    struct FlakyPublisher {
        down: AtomicBool,
        delivered: std::sync::Mutex<Vec<Envelope>>,
    }

    #[async_trait]
    impl Publisher for FlakyPublisher {
        async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(BusError::Closed);
            }
            self.delivered.lock().unwrap().extend(batch);
            Ok(())
        }
    }

    fn message(text: &str) -> Envelope {
        Envelope::from(OutboundMessage::new(Uuid::nil(), 1, text, Vec::new()))
    }

    #[tokio::test]
    async fn test_failed_publish_is_retained_and_flushed_in_order() {
        // Arrange
        let inner = Arc::new(FlakyPublisher::default());
        inner.down.store(true, Ordering::SeqCst);
        let outbox = OutboxPublisher::new(inner.clone());

        // Act
        outbox.publish(vec![message("a"), message("b")]).await.unwrap();
        outbox.publish(vec![message("c")]).await.unwrap();
        let pending_while_down = outbox.pending().await;
        inner.down.store(false, Ordering::SeqCst);
        let left = outbox.flush().await;

        // Assert
        assert_eq!(pending_while_down, 3);
        assert_eq!(left, 0);
        assert_eq!(
            *inner.delivered.lock().unwrap(),
            vec![message("a"), message("b"), message("c")]
        );
    }

    #[tokio::test]
    async fn test_publish_delivers_immediately_when_inner_is_up() {
        let inner = Arc::new(FlakyPublisher::default());
        let outbox = OutboxPublisher::new(inner.clone());

        outbox.publish(vec![message("a")]).await.unwrap();

        assert_eq!(outbox.pending().await, 0);
        assert_eq!(inner.delivered.lock().unwrap().len(), 1);
    }
}
