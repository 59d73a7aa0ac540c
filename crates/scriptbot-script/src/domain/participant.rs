//! Per-user runtime state against one bot's script.

use std::collections::{BTreeMap, BTreeSet};

use scriptbot_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::script::FINISH;

/// Text an end user gave at a question or selection block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The end user.
    pub user_id: i64,
    /// The block the answer was given at.
    pub state: u32,
    /// Literal user input.
    pub text: String,
}

impl Answer {
    /// Creates an answer.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for empty text.
    pub fn new(user_id: i64, state: u32, text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "empty answer at state {state}"
            )));
        }
        Ok(Self {
            user_id,
            state,
            text,
        })
    }
}

/// A user's position in a bot's script and the answers given so far.
///
/// `current_state == 0` means the user finished the script or never
/// entered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    bot_id: Uuid,
    user_id: i64,
    current_state: u32,
    answers: BTreeMap<u32, Answer>,
}

impl Participant {
    /// A participant that has not entered the script yet.
    #[must_use]
    pub fn new(bot_id: Uuid, user_id: i64) -> Self {
        Self {
            bot_id,
            user_id,
            current_state: FINISH,
            answers: BTreeMap::new(),
        }
    }

    /// Rebuilds a participant from storage.
    #[must_use]
    pub fn restore(bot_id: Uuid, user_id: i64, current_state: u32, answers: Vec<Answer>) -> Self {
        Self {
            bot_id,
            user_id,
            current_state,
            answers: answers.into_iter().map(|a| (a.state, a)).collect(),
        }
    }

    /// The bot this participant talks to.
    #[must_use]
    pub fn bot_id(&self) -> Uuid {
        self.bot_id
    }

    /// The end user.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// The block the user is parked at, or `0`.
    #[must_use]
    pub fn current_state(&self) -> u32 {
        self.current_state
    }

    /// Returns `true` once the script is finished (or was never entered).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_state == FINISH
    }

    /// Moves the user to `state`.
    pub fn move_to(&mut self, state: u32) {
        self.current_state = state;
    }

    /// Stores `answer`, replacing any earlier answer at the same state.
    pub fn record_answer(&mut self, answer: Answer) {
        self.answers.insert(answer.state, answer);
    }

    /// Drops every answer given at one of `states`.
    pub fn clear_answers(&mut self, states: &BTreeSet<u32>) {
        self.answers.retain(|state, _| !states.contains(state));
    }

    /// The answer given at `state`, if any.
    #[must_use]
    pub fn answer_at(&self, state: u32) -> Option<&Answer> {
        self.answers.get(&state)
    }

    /// Answers in ascending state order.
    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.values()
    }
}
