//! Background tasks owned by the API process.
//!
//! Every task is spawned on a [`TaskTracker`] so the server can wait for it
//! after cancelling `shutdown`: the in-process adapter stops its runners and
//! the outbox performs its final flush before the process exits.

use std::sync::Arc;
use std::time::Duration;

use scriptbot_adapter::{ChannelClient, Dispatcher, RunnerRegistry};
use scriptbot_bus::{InMemoryBus, OutboxPublisher, Publisher};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, warn};

/// Runs the channel adapter inside this process, fed by an in-memory bus.
/// Returns the publishing half of that bus.
pub fn spawn_in_process_adapter(
    tasks: &TaskTracker,
    client: Arc<dyn ChannelClient>,
    shutdown: &CancellationToken,
) -> Arc<dyn Publisher> {
    let (bus, subscriber) = InMemoryBus::channel();
    let registry = RunnerRegistry::new(client, shutdown.clone());
    let dispatcher = Dispatcher::new(Box::new(subscriber), registry);

    let shutdown = shutdown.clone();
    tasks.spawn(async move {
        if let Err(e) = dispatcher.run(shutdown).await {
            error!(error = %e, "in-process adapter stopped");
        }
    });
    Arc::new(bus)
}

/// Retries the outbox every `every` until `shutdown` fires, then flushes it
/// one last time.
pub fn spawn_outbox_flush(
    tasks: &TaskTracker,
    outbox: Arc<OutboxPublisher>,
    every: Duration,
    shutdown: CancellationToken,
) {
    tasks.spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let pending = outbox.flush().await;
                    if pending > 0 {
                        warn!(pending, "outbox still holds undelivered envelopes");
                    }
                }
            }
        }
        let pending = outbox.flush().await;
        if pending > 0 {
            warn!(pending, "outbox envelopes dropped at shutdown");
        }
    });
}
