//! Advances a participant through a script.
//!
//! Both operations mutate the participant in place and return the outbound
//! messages they produced. On error the participant may be half-updated;
//! callers run them inside a repository mutation scope, which discards the
//! copy instead of committing it.

use std::collections::BTreeSet;

use scriptbot_core::error::DomainError;
use serde::Serialize;

use super::graph;
use super::participant::{Answer, Participant};
use super::script::{Block, Script};

/// A message for the end user, before it is addressed for the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Message body.
    pub text: String,
    /// Reply buttons; empty unless the block is a selection.
    pub buttons: Vec<String>,
}

impl From<&Block> for Message {
    fn from(block: &Block) -> Self {
        Self {
            text: block.text.clone(),
            buttons: block.buttons(),
        }
    }
}

/// Result of one interpreter step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Outbound messages in traversal order.
    pub messages: Vec<Message>,
    /// The answer captured at the block the user replied to.
    pub answer: Option<Answer>,
}

/// Re-enters the script at entry point `key`.
///
/// Answers recorded anywhere in the subtree reachable from the entry's
/// target are erased first, so a re-entered flow never reports stale
/// answers. The participant then lands on the target and auto-advances past
/// message blocks.
///
/// # Errors
///
/// Returns `DomainError::EntryNotFound` for an unknown key and
/// `DomainError::RunawayScript` if auto-advance loops through message
/// blocks.
pub fn entry(script: &Script, participant: &mut Participant, key: &str) -> Result<Vec<Message>, DomainError> {
    let entry = script
        .entry_point(key)
        .ok_or_else(|| DomainError::EntryNotFound(key.to_owned()))?;

    let subtree = graph::reachable_from(script.block_map(), entry.state)?;
    participant.clear_answers(&subtree);

    let mut messages = Vec::new();
    land(script, participant, entry.state, &mut messages)?;
    Ok(messages)
}

/// Feeds one piece of user input into the script.
///
/// A finished participant is left alone. Otherwise the input is captured as
/// the answer of a question or selection block (whether or not it matched
/// an option), the participant moves to the routed state and auto-advances
/// past message blocks.
///
/// # Errors
///
/// Returns `DomainError::BlockNotFound` if the participant is parked at a
/// state the script no longer has, `DomainError::InvalidInput` for empty
/// input at a question or selection, and `DomainError::RunawayScript` if
/// auto-advance loops through message blocks.
pub fn process(script: &Script, participant: &mut Participant, text: &str) -> Result<Transition, DomainError> {
    if participant.is_finished() {
        return Ok(Transition::default());
    }

    let state = participant.current_state();
    let block = script
        .block(state)
        .ok_or(DomainError::BlockNotFound(state))?;

    let answer = if block.is_message() {
        None
    } else {
        Some(Answer::new(participant.user_id(), block.state, text)?)
    };

    let mut messages = Vec::new();
    land(script, participant, block.route(text), &mut messages)?;
    Ok(Transition { messages, answer })
}

/// Moves the participant to `state`, emits the landed block and keeps going
/// while it lands on message blocks.
fn land(
    script: &Script,
    participant: &mut Participant,
    mut state: u32,
    messages: &mut Vec<Message>,
) -> Result<(), DomainError> {
    let mut announced = BTreeSet::new();
    loop {
        participant.move_to(state);
        let Some(block) = script.block(state) else {
            return Ok(());
        };
        if block.is_message() && !announced.insert(state) {
            return Err(DomainError::RunawayScript(state));
        }
        messages.push(Message::from(block));
        if !block.is_message() {
            return Ok(());
        }
        state = block.next_state;
    }
}
