//! Scriptbot channel adapter.
//!
//! Consumes the bus: lifecycle commands open and close bot sessions through
//! the [`RunnerRegistry`], outbound messages are handed to the
//! [`ChannelClient`] of the running bot. Platform-specific session mechanics
//! live behind `ChannelClient`.

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use channel::{ChannelClient, LoggingChannelClient};
pub use config::AdapterConfig;
pub use dispatcher::Dispatcher;
pub use error::AdapterError;
pub use registry::RunnerRegistry;
