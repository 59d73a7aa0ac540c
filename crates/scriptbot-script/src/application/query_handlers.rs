//! Query handlers for the Script Authoring & Interpretation context.
//!
//! This module contains query handlers that load aggregates from their
//! repositories and return read-only view DTOs.

use chrono::{DateTime, Utc};
use scriptbot_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Bot, BotStatus};
use crate::domain::participant::{Answer, Participant};
use crate::domain::report::{AnswersTable, build_answers_table};
use crate::domain::repository::{BotRepository, ParticipantRepository};
use crate::domain::script::{Block, EntryPoint, Mailing};

/// Read-only view of a bot aggregate. The channel token is never exposed.
#[derive(Debug, Serialize)]
pub struct BotView {
    /// The bot identifier.
    pub bot_id: Uuid,
    /// Display name.
    pub name: String,
    /// Channel session status.
    pub status: BotStatus,
    /// Entry points in key order.
    pub entry_points: Vec<EntryPoint>,
    /// Blocks in state order.
    pub blocks: Vec<Block>,
    /// Mailings in the order they were added.
    pub mailings: Vec<Mailing>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<&Bot> for BotView {
    fn from(bot: &Bot) -> Self {
        Self {
            bot_id: bot.id,
            name: bot.name().to_owned(),
            status: bot.status(),
            entry_points: bot.script().entry_points().cloned().collect(),
            blocks: bot.script().blocks().cloned().collect(),
            mailings: bot.mailings().to_vec(),
            created_at: bot.created_at(),
            updated_at: bot.updated_at(),
        }
    }
}

/// Read-only view of one participant.
#[derive(Debug, Serialize)]
pub struct ParticipantView {
    /// The bot the participant talks to.
    pub bot_id: Uuid,
    /// The end user.
    pub user_id: i64,
    /// The block the user is parked at, `0` when finished.
    pub current_state: u32,
    /// Answers in ascending state order.
    pub answers: Vec<Answer>,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            bot_id: participant.bot_id(),
            user_id: participant.user_id(),
            current_state: participant.current_state(),
            answers: participant.answers().cloned().collect(),
        }
    }
}

/// Retrieves a bot owned by `owner_id`.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound` or `DomainError::PermissionDenied`.
pub async fn get_bot_by_id(
    bot_id: Uuid,
    owner_id: i64,
    bots: &dyn BotRepository,
) -> Result<BotView, DomainError> {
    let bot = bots.get(bot_id).await?;
    bot.ensure_owner(owner_id)?;
    Ok(BotView::from(&bot))
}

/// Lists every bot owned by `owner_id`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the store fails.
pub async fn list_bots_by_owner(
    owner_id: i64,
    bots: &dyn BotRepository,
) -> Result<Vec<BotView>, DomainError> {
    let owned = bots.list_by_owner(owner_id).await?;
    Ok(owned.iter().map(BotView::from).collect())
}

/// Builds the answers table of a bot owned by `owner_id`.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or a
/// persistence error.
pub async fn get_answers_table(
    bot_id: Uuid,
    owner_id: i64,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
) -> Result<AnswersTable, DomainError> {
    let bot = bots.get(bot_id).await?;
    bot.ensure_owner(owner_id)?;
    let audience = participants.list_by_bot(bot_id).await?;
    Ok(build_answers_table(bot.script(), &audience))
}

/// Retrieves one participant of a bot owned by `owner_id`.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or
/// `DomainError::ParticipantNotFound`.
pub async fn get_participant(
    bot_id: Uuid,
    owner_id: i64,
    user_id: i64,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
) -> Result<ParticipantView, DomainError> {
    let bot = bots.get(bot_id).await?;
    bot.ensure_owner(owner_id)?;
    let participant = participants.get(bot_id, user_id).await?;
    Ok(ParticipantView::from(&participant))
}
