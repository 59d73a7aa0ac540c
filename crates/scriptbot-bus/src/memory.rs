//! In-process bus backed by an unbounded `tokio::sync::mpsc` channel.
//!
//! Used when the engine and the adapter share one process, and in tests.
//! Unlike a broadcast channel it never drops envelopes for a slow
//! consumer; there is exactly one subscriber.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::envelope::Envelope;
use crate::error::BusError;
use crate::transport::{Delivery, Publisher, Subscriber};

struct Outlet {
    sender: mpsc::UnboundedSender<Delivery>,
    next_id: i64,
}

/// Publishing end of the in-process bus.
pub struct InMemoryBus {
    // Held for the whole batch so concurrent batches never interleave.
    outlet: Mutex<Outlet>,
}

/// Consuming end of the in-process bus.
#[derive(Debug)]
pub struct InMemorySubscriber {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl InMemoryBus {
    /// Creates a connected publisher/subscriber pair.
    #[must_use]
    pub fn channel() -> (Self, InMemorySubscriber) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let bus = Self {
            outlet: Mutex::new(Outlet { sender, next_id: 1 }),
        };
        (bus, InMemorySubscriber { receiver })
    }
}

#[async_trait]
impl Publisher for InMemoryBus {
    async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError> {
        let mut outlet = self.outlet.lock().map_err(|_| BusError::Closed)?;
        for envelope in batch {
            let id = outlet.next_id;
            outlet
                .sender
                .send(Delivery { id, envelope })
                .map_err(|_| BusError::Closed)?;
            outlet.next_id += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for InMemorySubscriber {
    async fn next(&mut self) -> Result<Option<Delivery>, BusError> {
        Ok(self.receiver.recv().await)
    }

    async fn ack(&mut self, _id: i64) -> Result<(), BusError> {
        Ok(())
    }
}
