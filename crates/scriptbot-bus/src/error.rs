//! Bus error types.

use scriptbot_core::error::DomainError;
use thiserror::Error;

/// Errors raised by bus transports.
#[derive(Debug, Error)]
pub enum BusError {
    /// The other end of the bus has gone away.
    #[error("bus closed")]
    Closed,

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row carries a topic this build does not know.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The PostgreSQL transport failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<BusError> for DomainError {
    fn from(err: BusError) -> Self {
        Self::Publish(err.to_string())
    }
}
