//! Script value types: blocks, entry points and mailings.
//!
//! Blocks reference their successors by state number, never by pointer.
//! A validated [`Script`] is an arena keyed by state.

use std::collections::BTreeMap;

use scriptbot_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::graph::{self, ScriptPolicy};

/// Successor value that finishes the script.
pub const FINISH: u32 = 0;

/// One selectable answer of a selection block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    /// Button label; also the exact input that picks this option.
    pub text: String,
    /// Destination state.
    pub next: u32,
}

/// What a block does with user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// Announcement; skipped over without waiting for input.
    Message,
    /// Free-text question.
    Question,
    /// Question with buttons; unmatched input falls back to `next_state`.
    Selection {
        /// Options in presentation order.
        options: Vec<SelectionOption>,
    },
}

/// A script step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unique key within the bot. Never `0`.
    pub state: u32,
    /// Successor; `0` finishes the script.
    pub next_state: u32,
    /// Reporting column header.
    #[serde(default)]
    pub title: String,
    /// Outbound message body.
    #[serde(default)]
    pub text: String,
    /// Block behavior.
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    /// Builds a message block.
    pub fn message(state: u32, next_state: u32, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            state,
            next_state,
            title: title.into(),
            text: text.into(),
            kind: BlockKind::Message,
        }
    }

    /// Builds a question block.
    pub fn question(state: u32, next_state: u32, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            state,
            next_state,
            title: title.into(),
            text: text.into(),
            kind: BlockKind::Question,
        }
    }

    /// Builds a selection block.
    pub fn selection(
        state: u32,
        next_state: u32,
        title: impl Into<String>,
        text: impl Into<String>,
        options: Vec<SelectionOption>,
    ) -> Self {
        Self {
            state,
            next_state,
            title: title.into(),
            text: text.into(),
            kind: BlockKind::Selection { options },
        }
    }

    /// Returns `true` for message blocks.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self.kind, BlockKind::Message)
    }

    /// Button labels, in option order. Empty unless this is a selection.
    #[must_use]
    pub fn buttons(&self) -> Vec<String> {
        match &self.kind {
            BlockKind::Message | BlockKind::Question => Vec::new(),
            BlockKind::Selection { options } => options.iter().map(|o| o.text.clone()).collect(),
        }
    }

    /// The state that `input` leads to.
    ///
    /// Selection input must match an option text exactly; the first match
    /// wins and anything else takes the `next_state` path.
    #[must_use]
    pub fn route(&self, input: &str) -> u32 {
        match &self.kind {
            BlockKind::Message | BlockKind::Question => self.next_state,
            BlockKind::Selection { options } => options
                .iter()
                .find(|option| option.text == input)
                .map_or(self.next_state, |option| option.next),
        }
    }

    /// Outgoing edges. `0` targets are included; callers skip them.
    pub fn successors(&self) -> impl Iterator<Item = u32> + '_ {
        let options: &[SelectionOption] = match &self.kind {
            BlockKind::Message | BlockKind::Question => &[],
            BlockKind::Selection { options } => options,
        };
        options
            .iter()
            .map(|option| option.next)
            .chain(std::iter::once(self.next_state))
    }

    /// Checks the per-block field rules.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` naming the block's state.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.state == FINISH {
            return Err(DomainError::InvalidInput(
                "block state must not be 0".to_owned(),
            ));
        }
        match &self.kind {
            BlockKind::Message | BlockKind::Question => {
                if self.title.is_empty() {
                    return Err(DomainError::InvalidInput(format!(
                        "block {} has an empty title",
                        self.state
                    )));
                }
                if self.text.is_empty() {
                    return Err(DomainError::InvalidInput(format!(
                        "block {} has an empty text",
                        self.state
                    )));
                }
            }
            BlockKind::Selection { options } => {
                if options.is_empty() {
                    return Err(DomainError::InvalidInput(format!(
                        "selection block {} has no options",
                        self.state
                    )));
                }
                if options.iter().any(|option| option.text.is_empty()) {
                    return Err(DomainError::InvalidInput(format!(
                        "selection block {} has an option with empty text",
                        self.state
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Named starting point into the script graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Unique key within the bot.
    pub key: String,
    /// Target state.
    pub state: u32,
}

impl EntryPoint {
    /// Creates a new entry point.
    pub fn new(key: impl Into<String>, state: u32) -> Self {
        Self {
            key: key.into(),
            state,
        }
    }
}

/// Broadcast that re-enters `entry_key` for every participant parked at
/// `required_state` (`0` addresses participants that finished).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailing {
    /// Unique name within the bot.
    pub name: String,
    /// Entry point to invoke.
    pub entry_key: String,
    /// State a participant must be at to receive the mailing.
    pub required_state: u32,
}

impl Mailing {
    /// Creates a new mailing.
    pub fn new(name: impl Into<String>, entry_key: impl Into<String>, required_state: u32) -> Self {
        Self {
            name: name.into(),
            entry_key: entry_key.into(),
            required_state,
        }
    }
}

/// A validated script: every block is reachable from an entry point and
/// every edge targets an existing block or `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    entry_points: BTreeMap<String, EntryPoint>,
    blocks: BTreeMap<u32, Block>,
}

impl Script {
    /// Validates and assembles a script.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for malformed fields or a missing
    /// entry point, `BlockDuplicated`/`EntryDuplicated` for repeated keys,
    /// and the graph errors of [`graph::validate`].
    pub fn new(
        entry_points: Vec<EntryPoint>,
        blocks: Vec<Block>,
        policy: ScriptPolicy,
    ) -> Result<Self, DomainError> {
        let mut block_map = BTreeMap::new();
        for block in blocks {
            block.validate()?;
            let state = block.state;
            if block_map.insert(state, block).is_some() {
                return Err(DomainError::BlockDuplicated(state));
            }
        }

        if entry_points.is_empty() {
            return Err(DomainError::InvalidInput(
                "a bot must define at least one entry point".to_owned(),
            ));
        }
        let mut entry_map = BTreeMap::new();
        for entry in entry_points {
            if entry.key.is_empty() {
                return Err(DomainError::InvalidInput(
                    "entry point key must not be empty".to_owned(),
                ));
            }
            if entry.state == FINISH {
                return Err(DomainError::InvalidInput(format!(
                    "entry point {:?} must target a block",
                    entry.key
                )));
            }
            if entry_map.contains_key(&entry.key) {
                return Err(DomainError::EntryDuplicated(entry.key));
            }
            entry_map.insert(entry.key.clone(), entry);
        }

        graph::validate(&entry_map, &block_map, policy)?;

        Ok(Self {
            entry_points: entry_map,
            blocks: block_map,
        })
    }

    /// Reassembles a script loaded from trusted storage without validating it.
    #[must_use]
    pub fn restore(entry_points: Vec<EntryPoint>, blocks: Vec<Block>) -> Self {
        Self {
            entry_points: entry_points
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
            blocks: blocks.into_iter().map(|block| (block.state, block)).collect(),
        }
    }

    /// Looks up a block by state.
    #[must_use]
    pub fn block(&self, state: u32) -> Option<&Block> {
        self.blocks.get(&state)
    }

    /// Looks up an entry point by key.
    #[must_use]
    pub fn entry_point(&self, key: &str) -> Option<&EntryPoint> {
        self.entry_points.get(key)
    }

    /// Blocks in ascending state order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Entry points in ascending key order.
    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.values()
    }

    /// The block arena.
    #[must_use]
    pub fn block_map(&self) -> &BTreeMap<u32, Block> {
        &self.blocks
    }
}
