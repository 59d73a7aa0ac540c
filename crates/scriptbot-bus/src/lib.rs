//! Scriptbot bus: the asynchronous channel between the script engine and
//! the channel adapter.
//!
//! - [`envelope`]: wire payloads: outbound chat messages and runner
//!   lifecycle commands.
//! - [`Publisher`] / [`Subscriber`]: the two ends of the bus.
//! - [`InMemoryBus`]: single-process bus backed by `tokio::sync::mpsc`.
//! - [`PgBus`]: PostgreSQL-backed bus for running the engine and the
//!   adapter as separate processes.
//! - [`OutboxPublisher`]: retrying wrapper that keeps undelivered batches
//!   in order.

pub mod envelope;
pub mod error;
pub mod memory;
pub mod outbox;
pub mod pg;
pub mod transport;

pub use envelope::{Envelope, LifecycleCommand, OutboundMessage, RunnerCommand, Topic};
pub use error::BusError;
pub use memory::{InMemoryBus, InMemorySubscriber};
pub use outbox::OutboxPublisher;
pub use pg::{PgBus, PgSubscriber};
pub use transport::{Delivery, Publisher, Subscriber};
