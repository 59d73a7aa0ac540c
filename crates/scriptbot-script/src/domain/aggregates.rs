//! Aggregate roots for the Script Authoring & Interpretation context.

use chrono::{DateTime, Utc};
use scriptbot_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::ScriptPolicy;
use super::script::{Block, EntryPoint, FINISH, Mailing, Script};

/// Channel session status of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    /// No live channel session.
    Stopped,
    /// A start command was published.
    Started,
    /// The start command could not be published.
    Failed,
}

impl BotStatus {
    /// Stable storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored status name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` for unknown names.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "stopped" => Ok(Self::Stopped),
            "started" => Ok(Self::Started),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Infrastructure(format!(
                "unknown bot status {other:?}"
            ))),
        }
    }
}

/// Every field of a bot, as stored.
#[derive(Debug, Clone)]
pub struct BotSnapshot {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Operator that owns the bot.
    pub owner_id: i64,
    /// Display name.
    pub name: String,
    /// Channel credential.
    pub token: String,
    /// Channel session status.
    pub status: BotStatus,
    /// Entry points.
    pub entry_points: Vec<EntryPoint>,
    /// Blocks.
    pub blocks: Vec<Block>,
    /// Mailings.
    pub mailings: Vec<Mailing>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// The aggregate root for a bot and its script.
#[derive(Debug, Clone)]
pub struct Bot {
    /// Aggregate identifier.
    pub id: Uuid,
    owner_id: i64,
    name: String,
    token: String,
    status: BotStatus,
    script: Script,
    mailings: Vec<Mailing>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Bot {
    /// Creates a stopped bot with a validated script.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for an empty name or token, and any
    /// script validation error from [`Script::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        owner_id: i64,
        name: String,
        token: String,
        entry_points: Vec<EntryPoint>,
        blocks: Vec<Block>,
        policy: ScriptPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidInput("bot name must not be empty".to_owned()));
        }
        if token.trim().is_empty() {
            return Err(DomainError::InvalidInput("bot token must not be empty".to_owned()));
        }
        let script = Script::new(entry_points, blocks, policy)?;
        Ok(Self {
            id,
            owner_id,
            name,
            token,
            status: BotStatus::Stopped,
            script,
            mailings: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a bot from storage without re-validating its script.
    #[must_use]
    pub fn restore(snapshot: BotSnapshot) -> Self {
        Self {
            id: snapshot.id,
            owner_id: snapshot.owner_id,
            name: snapshot.name,
            token: snapshot.token,
            status: snapshot.status,
            script: Script::restore(snapshot.entry_points, snapshot.blocks),
            mailings: snapshot.mailings,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }

    /// Copies every field out for storage.
    #[must_use]
    pub fn snapshot(&self) -> BotSnapshot {
        BotSnapshot {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name.clone(),
            token: self.token.clone(),
            status: self.status,
            entry_points: self.script.entry_points().cloned().collect(),
            blocks: self.script.blocks().cloned().collect(),
            mailings: self.mailings.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Replaces entry points and blocks wholesale.
    ///
    /// The new script is fully validated before anything changes; on error
    /// the current script stays in place. Mailings must still point at an
    /// existing entry point and state.
    ///
    /// # Errors
    ///
    /// Returns any script validation error, `DomainError::EntryNotFound` or
    /// `DomainError::BlockNotFound` for a mailing the new script would break.
    pub fn set_script(
        &mut self,
        entry_points: Vec<EntryPoint>,
        blocks: Vec<Block>,
        policy: ScriptPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let script = Script::new(entry_points, blocks, policy)?;
        for mailing in &self.mailings {
            check_mailing_targets(&script, mailing)?;
        }
        self.script = script;
        self.updated_at = now;
        Ok(())
    }

    /// Adds a mailing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for an empty name,
    /// `DomainError::MailingDuplicated` for a taken name,
    /// `DomainError::EntryNotFound` for an unknown entry key and
    /// `DomainError::BlockNotFound` for an unknown required state.
    pub fn add_mailing(&mut self, mailing: Mailing, now: DateTime<Utc>) -> Result<(), DomainError> {
        if mailing.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("mailing name must not be empty".to_owned()));
        }
        if self.mailing(&mailing.name).is_some() {
            return Err(DomainError::MailingDuplicated(mailing.name));
        }
        check_mailing_targets(&self.script, &mailing)?;
        self.mailings.push(mailing);
        self.updated_at = now;
        Ok(())
    }

    /// Records a new channel session status.
    pub fn set_status(&mut self, status: BotStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Fails unless `owner_id` owns this bot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PermissionDenied`.
    pub fn ensure_owner(&self, owner_id: i64) -> Result<(), DomainError> {
        if self.owner_id == owner_id {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied(self.id))
        }
    }

    /// Looks up a mailing by name.
    #[must_use]
    pub fn mailing(&self, name: &str) -> Option<&Mailing> {
        self.mailings.iter().find(|mailing| mailing.name == name)
    }

    /// The validated script.
    #[must_use]
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Mailings in the order they were added.
    #[must_use]
    pub fn mailings(&self) -> &[Mailing] {
        &self.mailings
    }

    /// Operator that owns the bot.
    #[must_use]
    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel credential.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Channel session status.
    #[must_use]
    pub fn status(&self) -> BotStatus {
        self.status
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn check_mailing_targets(script: &Script, mailing: &Mailing) -> Result<(), DomainError> {
    if script.entry_point(&mailing.entry_key).is_none() {
        return Err(DomainError::EntryNotFound(mailing.entry_key.clone()));
    }
    if mailing.required_state != FINISH && script.block(mailing.required_state).is_none() {
        return Err(DomainError::BlockNotFound(mailing.required_state));
    }
    Ok(())
}
