//! Shared application state.

use std::sync::Arc;

use scriptbot_bus::Publisher;
use scriptbot_core::clock::Clock;
use scriptbot_script::domain::graph::ScriptPolicy;
use scriptbot_script::domain::repository::{BotRepository, ParticipantRepository};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Time source for aggregate timestamps.
    pub clock: Arc<dyn Clock>,
    /// Bot store.
    pub bots: Arc<dyn BotRepository>,
    /// Participant store.
    pub participants: Arc<dyn ParticipantRepository>,
    /// Bus towards the channel adapter.
    pub publisher: Arc<dyn Publisher>,
    /// Validation options for submitted scripts.
    pub policy: ScriptPolicy,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        bots: Arc<dyn BotRepository>,
        participants: Arc<dyn ParticipantRepository>,
        publisher: Arc<dyn Publisher>,
        policy: ScriptPolicy,
    ) -> Self {
        Self {
            clock,
            bots,
            participants,
            publisher,
            policy,
        }
    }
}
