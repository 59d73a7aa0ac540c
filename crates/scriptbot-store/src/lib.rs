//! Scriptbot stores: implementations of the bot and participant
//! repository contracts.
//!
//! - [`in_memory`]: process-local stores for tests and single-process runs.
//! - [`pg_bot_repository`] / [`pg_participant_repository`]: PostgreSQL
//!   stores sharing the `migrations/` schema.

pub mod in_memory;
pub mod pg_bot_repository;
pub mod pg_participant_repository;

pub use in_memory::{InMemoryBotRepository, InMemoryParticipantRepository};
pub use pg_bot_repository::PgBotRepository;
pub use pg_participant_repository::PgParticipantRepository;

use scriptbot_core::error::DomainError;

pub(crate) fn infrastructure(err: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}
