//! Adapter error types.

use scriptbot_bus::BusError;
use thiserror::Error;

/// Errors raised while handling bus deliveries.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// `stop`, or a message, addressed a bot without a running session.
    #[error("no runner for bot {0}")]
    RunnerNotFound(String),

    /// A `start` command arrived without a channel credential.
    #[error("start command for bot {0} carries no token")]
    MissingToken(String),

    /// The chat platform rejected a call.
    #[error("channel error: {0}")]
    Channel(String),

    /// The bus failed.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
