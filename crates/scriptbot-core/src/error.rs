//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Script validation variants carry the offending state or key so operators
/// can locate the broken part of a script.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required field is empty or otherwise malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A block, entry point or option references a state that has no block.
    #[error("block not found: state {0}")]
    BlockNotFound(u32),

    /// Two blocks share the same state.
    #[error("block duplicated: state {0}")]
    BlockDuplicated(u32),

    /// Two entry points share the same key.
    #[error("entry point duplicated: key {0:?}")]
    EntryDuplicated(String),

    /// A block cannot be reached from any entry point.
    #[error("unused block: state {0} is not reachable from any entry point")]
    UnusedBlock(u32),

    /// The script loops back on itself while cycles are rejected.
    #[error("cycle detected: state {0} is reachable from itself")]
    CycleDetected(u32),

    /// No entry point with the given key.
    #[error("entry point not found: key {0:?}")]
    EntryNotFound(String),

    /// No mailing with the given name.
    #[error("mailing not found: {0:?}")]
    MailingNotFound(String),

    /// Two mailings share the same name.
    #[error("mailing duplicated: {0:?}")]
    MailingDuplicated(String),

    /// Auto-advance revisited a message block without waiting for input.
    #[error("runaway script: message block {0} was revisited during auto-advance")]
    RunawayScript(u32),

    /// A bot was not found.
    #[error("bot not found: {0}")]
    BotNotFound(Uuid),

    /// A bot with the same identifier already exists.
    #[error("bot already exists: {0}")]
    BotAlreadyExists(Uuid),

    /// A participant was not found.
    #[error("participant not found: bot {bot_id}, user {user_id}")]
    ParticipantNotFound {
        /// The bot the lookup targeted.
        bot_id: Uuid,
        /// The end user the lookup targeted.
        user_id: i64,
    },

    /// The caller does not own the bot.
    #[error("permission denied on bot {0}")]
    PermissionDenied(Uuid),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// The message bus rejected a publish.
    #[error("publish error: {0}")]
    Publish(String),
}

impl DomainError {
    /// Returns `true` for errors produced by script validation.
    #[must_use]
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            Self::BlockNotFound(_)
                | Self::BlockDuplicated(_)
                | Self::EntryDuplicated(_)
                | Self::UnusedBlock(_)
                | Self::CycleDetected(_)
        )
    }
}
