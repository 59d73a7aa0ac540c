//! The two ends of the bus.

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::BusError;

/// Publishing end, held by the script engine.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes a batch of envelopes.
    ///
    /// Envelopes of one batch are delivered in the given order and are not
    /// interleaved with envelopes of other batches.
    async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError>;
}

/// An envelope handed to a subscriber, identified for acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-assigned, monotonically increasing id.
    pub id: i64,
    /// The payload.
    pub envelope: Envelope,
}

/// Consuming end, held by the channel adapter.
#[async_trait]
pub trait Subscriber: Send {
    /// Waits for the next delivery. Returns `None` once the bus is closed.
    async fn next(&mut self) -> Result<Option<Delivery>, BusError>;

    /// Marks a delivery as handled. Unacknowledged deliveries of a durable
    /// transport are handed out again after a restart.
    async fn ack(&mut self, id: i64) -> Result<(), BusError>;
}
