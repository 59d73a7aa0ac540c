//! Test publishers: mock `Publisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use scriptbot_bus::{BusError, Envelope, LifecycleCommand, OutboundMessage, Publisher};

/// A publisher that records every batch it is handed and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<Envelope>>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every published batch, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn batches(&self) -> Vec<Vec<Envelope>> {
        self.batches.lock().unwrap().clone()
    }

    /// Returns every published chat message, flattened across batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.batches()
            .into_iter()
            .flatten()
            .filter_map(|envelope| match envelope {
                Envelope::Message(message) => Some(message),
                Envelope::Lifecycle(_) => None,
            })
            .collect()
    }

    /// Returns every published lifecycle command, flattened across batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn lifecycle_commands(&self) -> Vec<LifecycleCommand> {
        self.batches()
            .into_iter()
            .flatten()
            .filter_map(|envelope| match envelope {
                Envelope::Lifecycle(command) => Some(command),
                Envelope::Message(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

/// A publisher whose bus is always closed. Useful for testing the
/// publish-after-commit error paths.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _batch: Vec<Envelope>) -> Result<(), BusError> {
        Err(BusError::Closed)
    }
}
