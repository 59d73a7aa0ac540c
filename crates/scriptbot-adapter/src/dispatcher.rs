//! Sequential consumer of the bus.
//!
//! Deliveries are handled one at a time in bus order, which keeps the order
//! of messages for each end user. A delivery is acknowledged after it was
//! handled, whether or not handling succeeded; failures are reported in the
//! log and the envelope is dropped.

use scriptbot_bus::{Envelope, LifecycleCommand, RunnerCommand, Subscriber};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::AdapterError;
use crate::registry::RunnerRegistry;

/// Routes bus envelopes to the runner registry.
pub struct Dispatcher {
    subscriber: Box<dyn Subscriber>,
    registry: RunnerRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(subscriber: Box<dyn Subscriber>, registry: RunnerRegistry) -> Self {
        Self {
            subscriber,
            registry,
        }
    }

    /// The registry, for inspection.
    #[must_use]
    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    /// Consumes deliveries until the bus closes or `shutdown` fires, then
    /// stops every runner.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Bus` if the subscriber fails.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), AdapterError> {
        let outcome = self.consume(&shutdown).await;
        self.registry.stop_all().await;
        info!("dispatcher stopped");
        outcome
    }

    async fn consume(&mut self, shutdown: &CancellationToken) -> Result<(), AdapterError> {
        loop {
            let next = tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                next = self.subscriber.next() => next?,
            };
            let Some(delivery) = next else {
                return Ok(());
            };
            if let Err(e) = self.dispatch(delivery.envelope).await {
                error!(delivery_id = delivery.id, error = %e, "failed to handle bus delivery");
            }
            self.subscriber.ack(delivery.id).await?;
        }
    }

    /// Handles one envelope.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::RunnerNotFound` for a `stop` or a message
    /// addressed to a bot that is not running, `AdapterError::MissingToken`
    /// for a `start` without credential, and channel errors.
    #[instrument(skip_all, fields(topic = envelope.topic().as_str(), destination = %envelope.destination()))]
    pub async fn dispatch(&mut self, envelope: Envelope) -> Result<(), AdapterError> {
        match envelope {
            Envelope::Lifecycle(LifecycleCommand {
                bot_uuid,
                command: RunnerCommand::Start,
                token,
            }) => {
                let token = token.ok_or_else(|| AdapterError::MissingToken(bot_uuid.clone()))?;
                self.registry.start(&bot_uuid, &token).await
            }
            Envelope::Lifecycle(LifecycleCommand {
                bot_uuid,
                command: RunnerCommand::Stop,
                ..
            }) => self.registry.stop(&bot_uuid).await,
            Envelope::Message(message) => {
                self.registry
                    .send(&message.bot_uuid, message.user_id, &message.text, &message.buttons)
                    .await
            }
        }
    }
}
