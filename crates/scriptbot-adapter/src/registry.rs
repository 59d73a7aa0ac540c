//! Running bot sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::ChannelClient;
use crate::error::AdapterError;

struct Runner {
    token: String,
    cancel: CancellationToken,
}

/// Owns one runner per started bot.
///
/// `start` is idempotent; `stop` on a bot that is not running is an error
/// the caller reports.
pub struct RunnerRegistry {
    client: Arc<dyn ChannelClient>,
    runners: HashMap<String, Runner>,
    shutdown: CancellationToken,
}

impl RunnerRegistry {
    /// Creates an empty registry. Every runner token is a child of
    /// `shutdown`.
    #[must_use]
    pub fn new(client: Arc<dyn ChannelClient>, shutdown: CancellationToken) -> Self {
        Self {
            client,
            runners: HashMap::new(),
            shutdown,
        }
    }

    /// Opens the session of `bot_id` unless it is already running.
    ///
    /// # Errors
    ///
    /// Returns the client's error if the session cannot be opened.
    pub async fn start(&mut self, bot_id: &str, token: &str) -> Result<(), AdapterError> {
        if self.runners.contains_key(bot_id) {
            debug!(bot_id, "runner already started");
            return Ok(());
        }

        let cancel = self.shutdown.child_token();
        self.client.open(bot_id, token, cancel.clone()).await?;
        self.runners.insert(
            bot_id.to_owned(),
            Runner {
                token: token.to_owned(),
                cancel,
            },
        );
        info!(bot_id, running = self.runners.len(), "runner started");
        Ok(())
    }

    /// Cancels and closes the session of `bot_id`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::RunnerNotFound` if the bot is not running, or
    /// the client's error if closing fails (the runner is gone either way).
    pub async fn stop(&mut self, bot_id: &str) -> Result<(), AdapterError> {
        let runner = self
            .runners
            .remove(bot_id)
            .ok_or_else(|| AdapterError::RunnerNotFound(bot_id.to_owned()))?;
        runner.cancel.cancel();
        self.client.close(bot_id).await?;
        info!(bot_id, running = self.runners.len(), "runner stopped");
        Ok(())
    }

    /// Sends a message through the running session of `bot_id`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::RunnerNotFound` if the bot is not running, or
    /// the client's error.
    pub async fn send(
        &self,
        bot_id: &str,
        user_id: i64,
        text: &str,
        buttons: &[String],
    ) -> Result<(), AdapterError> {
        let runner = self
            .runners
            .get(bot_id)
            .ok_or_else(|| AdapterError::RunnerNotFound(bot_id.to_owned()))?;
        self.client.send(&runner.token, user_id, text, buttons).await
    }

    /// Returns `true` while `bot_id` has a session.
    #[must_use]
    pub fn is_running(&self, bot_id: &str) -> bool {
        self.runners.contains_key(bot_id)
    }

    /// Stops every runner.
    pub async fn stop_all(&mut self) {
        let bot_ids: Vec<String> = self.runners.keys().cloned().collect();
        for bot_id in bot_ids {
            if let Err(e) = self.stop(&bot_id).await {
                warn!(bot_id, error = %e, "failed to stop runner");
            }
        }
    }
}
