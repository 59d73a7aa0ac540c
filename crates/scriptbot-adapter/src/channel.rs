//! Chat-platform boundary.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AdapterError;

/// Live connection to a chat platform.
///
/// `open` hands the client a cancellation token; the client's session for
/// that bot (long polling, webhook registration, ...) must end once the
/// token is cancelled.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Opens the platform session of a bot.
    async fn open(&self, bot_id: &str, token: &str, cancel: CancellationToken) -> Result<(), AdapterError>;

    /// Closes the platform session of a bot.
    async fn close(&self, bot_id: &str) -> Result<(), AdapterError>;

    /// Delivers one message to an end user.
    async fn send(
        &self,
        token: &str,
        user_id: i64,
        text: &str,
        buttons: &[String],
    ) -> Result<(), AdapterError>;
}

/// A client that only logs what it would do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChannelClient;

#[async_trait]
impl ChannelClient for LoggingChannelClient {
    async fn open(&self, bot_id: &str, _token: &str, _cancel: CancellationToken) -> Result<(), AdapterError> {
        info!(bot_id, "channel session opened");
        Ok(())
    }

    async fn close(&self, bot_id: &str) -> Result<(), AdapterError> {
        info!(bot_id, "channel session closed");
        Ok(())
    }

    async fn send(
        &self,
        _token: &str,
        user_id: i64,
        text: &str,
        buttons: &[String],
    ) -> Result<(), AdapterError> {
        info!(user_id, text, buttons = ?buttons, "message delivered");
        Ok(())
    }
}
