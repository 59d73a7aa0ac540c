//! Persistence contracts for bots and participants.
//!
//! The application layer depends only on these traits; storage technology
//! lives in `scriptbot-store`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scriptbot_core::error::DomainError;
use uuid::Uuid;

use super::aggregates::{Bot, BotStatus};
use super::interpreter::Transition;
use super::participant::Participant;

/// Mutation applied to a bot inside its update scope.
pub type BotMutation<'a> = Box<dyn FnOnce(&mut Bot) -> Result<(), DomainError> + Send + 'a>;

/// Mutation applied to a participant inside its update scope.
pub type ParticipantMutation<'a> =
    Box<dyn FnOnce(&mut Participant) -> Result<Transition, DomainError> + Send + 'a>;

/// Store for bot aggregates.
#[async_trait]
pub trait BotRepository: Send + Sync {
    /// Inserts a new bot.
    ///
    /// Fails with `DomainError::BotAlreadyExists` if the id is taken.
    async fn create(&self, bot: &Bot) -> Result<(), DomainError>;

    /// Loads a bot, applies `mutate` and saves the whole bot.
    ///
    /// Updates of the same bot are serialized. If `mutate` fails nothing is
    /// written and its error is returned.
    async fn update(&self, bot_id: Uuid, mutate: BotMutation<'_>) -> Result<Bot, DomainError>;

    /// Records a new status.
    async fn update_status(
        &self,
        bot_id: Uuid,
        status: BotStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Deletes a bot.
    ///
    /// Fails with `DomainError::BotNotFound` if there is nothing to delete.
    async fn delete(&self, bot_id: Uuid) -> Result<(), DomainError>;

    /// Fetches a bot by id.
    async fn get(&self, bot_id: Uuid) -> Result<Bot, DomainError>;

    /// Fetches every bot of an operator.
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Bot>, DomainError>;

    /// Fetches every bot with the given status.
    async fn list_by_status(&self, status: BotStatus) -> Result<Vec<Bot>, DomainError>;
}

/// Store for participants and their answers.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Loads the participant (or a fresh one), applies `mutate` exactly once
    /// and persists the complete resulting state atomically.
    ///
    /// At most one mutation per `(bot_id, user_id)` runs at a time; other
    /// participants are not blocked. If `mutate` fails, or the call is
    /// cancelled before it commits, nothing is written.
    async fn update_or_create(
        &self,
        bot_id: Uuid,
        user_id: i64,
        mutate: ParticipantMutation<'_>,
    ) -> Result<Transition, DomainError>;

    /// Fetches a participant.
    ///
    /// Fails with `DomainError::ParticipantNotFound` if the user never
    /// interacted with the bot.
    async fn get(&self, bot_id: Uuid, user_id: i64) -> Result<Participant, DomainError>;

    /// Fetches every participant of a bot.
    async fn list_by_bot(&self, bot_id: Uuid) -> Result<Vec<Participant>, DomainError>;

    /// Deletes every participant of a bot.
    async fn delete_by_bot(&self, bot_id: Uuid) -> Result<(), DomainError>;
}
