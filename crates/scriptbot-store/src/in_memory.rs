//! Process-local stores.
//!
//! Mutations run against a clone of the stored value, which replaces the
//! original only once the mutation succeeded. A failed mutation leaves the
//! store untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

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

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::Infrastructure("in-memory store lock poisoned".into()))
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

/// Bot store held in a single map.
#[derive(Debug, Default)]
pub struct InMemoryBotRepository {
    bots: Mutex<HashMap<Uuid, Bot>>,
}

impl InMemoryBotRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BotRepository for InMemoryBotRepository {
    async fn create(&self, bot: &Bot) -> Result<(), DomainError> {
        let mut bots = lock(&self.bots)?;
        if bots.contains_key(&bot.id) {
            return Err(DomainError::BotAlreadyExists(bot.id));
        }
        bots.insert(bot.id, bot.clone());
        Ok(())
    }

    async fn update(&self, bot_id: Uuid, mutate: BotMutation<'_>) -> Result<Bot, DomainError> {
        let mut bots = lock(&self.bots)?;
        let stored = bots.get_mut(&bot_id).ok_or(DomainError::BotNotFound(bot_id))?;
        let mut working = stored.clone();
        mutate(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }

    async fn update_status(
        &self,
        bot_id: Uuid,
        status: BotStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut bots = lock(&self.bots)?;
        let stored = bots.get_mut(&bot_id).ok_or(DomainError::BotNotFound(bot_id))?;
        stored.set_status(status, at);
        Ok(())
    }

    async fn delete(&self, bot_id: Uuid) -> Result<(), DomainError> {
        lock(&self.bots)?
            .remove(&bot_id)
            .map(|_| ())
            .ok_or(DomainError::BotNotFound(bot_id))
    }

    async fn get(&self, bot_id: Uuid) -> Result<Bot, DomainError> {
        lock(&self.bots)?
            .get(&bot_id)
            .cloned()
            .ok_or(DomainError::BotNotFound(bot_id))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Bot>, DomainError> {
        let mut owned: Vec<Bot> = lock(&self.bots)?
            .values()
            .filter(|bot| bot.owner_id() == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(Bot::created_at);
        Ok(owned)
    }

    async fn list_by_status(&self, status: BotStatus) -> Result<Vec<Bot>, DomainError> {
        Ok(lock(&self.bots)?
            .values()
            .filter(|bot| bot.status() == status)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

type Slot = Arc<Mutex<Option<Participant>>>;

/// Participant store with one lock per `(bot, user)` pair, so mutations of
/// different participants run concurrently.
#[derive(Debug, Default)]
pub struct InMemoryParticipantRepository {
    slots: Mutex<HashMap<(Uuid, i64), Slot>>,
}

impl InMemoryParticipantRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, bot_id: Uuid, user_id: i64) -> Result<Slot, DomainError> {
        let mut slots = lock(&self.slots)?;
        Ok(Arc::clone(slots.entry((bot_id, user_id)).or_default()))
    }

    /// Drops the slot of a participant that was never stored, unless another
    /// caller holds a handle to it. Handles are only cloned under the map
    /// lock, so the count cannot grow while it is checked.
    fn release_if_unused(&self, bot_id: Uuid, user_id: i64, slot: &Slot) -> Result<(), DomainError> {
        let mut slots = lock(&self.slots)?;
        // One handle in the map, one held here.
        if Arc::strong_count(slot) == 2 && lock(slot)?.is_none() {
            slots.remove(&(bot_id, user_id));
        }
        Ok(())
    }

    fn slots_of(&self, bot_id: Uuid) -> Result<Vec<Slot>, DomainError> {
        Ok(lock(&self.slots)?
            .iter()
            .filter(|((slot_bot, _), _)| *slot_bot == bot_id)
            .map(|(_, slot)| Arc::clone(slot))
            .collect())
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn update_or_create(
        &self,
        bot_id: Uuid,
        user_id: i64,
        mutate: ParticipantMutation<'_>,
    ) -> Result<Transition, DomainError> {
        let slot = self.slot(bot_id, user_id)?;
        let outcome = {
            let mut stored = lock(&slot)?;
            let mut working = stored
                .clone()
                .unwrap_or_else(|| Participant::new(bot_id, user_id));
            mutate(&mut working).map(|transition| {
                *stored = Some(working);
                transition
            })
        };

        if outcome.is_err() {
            self.release_if_unused(bot_id, user_id, &slot)?;
        }
        outcome
    }

    async fn get(&self, bot_id: Uuid, user_id: i64) -> Result<Participant, DomainError> {
        let not_found = || DomainError::ParticipantNotFound { bot_id, user_id };
        let slot = lock(&self.slots)?
            .get(&(bot_id, user_id))
            .map(Arc::clone)
            .ok_or_else(not_found)?;
        let stored = lock(&slot)?;
        stored.clone().ok_or_else(not_found)
    }

    async fn list_by_bot(&self, bot_id: Uuid) -> Result<Vec<Participant>, DomainError> {
        let mut participants = Vec::new();
        for slot in self.slots_of(bot_id)? {
            if let Some(participant) = lock(&slot)?.clone() {
                participants.push(participant);
            }
        }
        participants.sort_by_key(Participant::user_id);
        Ok(participants)
    }

    async fn delete_by_bot(&self, bot_id: Uuid) -> Result<(), DomainError> {
        lock(&self.slots)?.retain(|(slot_bot, _), _| *slot_bot != bot_id);
        Ok(())
    }
}
