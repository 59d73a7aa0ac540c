//! Test repositories: always-failing repository implementations for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scriptbot_core::error::DomainError;
use scriptbot_script::domain::aggregates::{Bot, BotStatus};
use scriptbot_script::domain::interpreter::Transition;
use scriptbot_script::domain::participant::Participant;
use scriptbot_script::domain::repository::{
    BotMutation, BotRepository, ParticipantMutation, ParticipantRepository,
};
use uuid::Uuid;

fn refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

/// A bot repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingBotRepository;

#[async_trait]
impl BotRepository for FailingBotRepository {
    async fn create(&self, _bot: &Bot) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn update(&self, _bot_id: Uuid, _mutate: BotMutation<'_>) -> Result<Bot, DomainError> {
        Err(refused())
    }

    async fn update_status(
        &self,
        _bot_id: Uuid,
        _status: BotStatus,
        _at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn delete(&self, _bot_id: Uuid) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn get(&self, _bot_id: Uuid) -> Result<Bot, DomainError> {
        Err(refused())
    }

    async fn list_by_owner(&self, _owner_id: i64) -> Result<Vec<Bot>, DomainError> {
        Err(refused())
    }

    async fn list_by_status(&self, _status: BotStatus) -> Result<Vec<Bot>, DomainError> {
        Err(refused())
    }
}

/// A participant repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingParticipantRepository;

#[async_trait]
impl ParticipantRepository for FailingParticipantRepository {
    async fn update_or_create(
        &self,
        _bot_id: Uuid,
        _user_id: i64,
        _mutate: ParticipantMutation<'_>,
    ) -> Result<Transition, DomainError> {
        Err(refused())
    }

    async fn get(&self, _bot_id: Uuid, _user_id: i64) -> Result<Participant, DomainError> {
        Err(refused())
    }

    async fn list_by_bot(&self, _bot_id: Uuid) -> Result<Vec<Participant>, DomainError> {
        Err(refused())
    }

    async fn delete_by_bot(&self, _bot_id: Uuid) -> Result<(), DomainError> {
        Err(refused())
    }
}
