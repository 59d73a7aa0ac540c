//! Reachability over the block graph.
//!
//! Blocks are vertices, `next_state` and every option's `next` are edges,
//! and a `0` target is a terminal marker rather than an edge. Traversal is
//! an iterative depth-first search with white/grey/black coloring, so deep
//! scripts cannot overflow the stack.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use scriptbot_core::error::DomainError;

use super::script::{Block, EntryPoint, FINISH};

/// How validation treats scripts that loop back on themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Loops are allowed (e.g. a retry block pointing at an earlier
    /// question).
    #[default]
    Permissive,
    /// Any loop fails validation with `DomainError::CycleDetected`.
    Reject,
}

impl CyclePolicy {
    /// Parses a configuration value (`permissive` or `reject`).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for any other value.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "permissive" => Ok(Self::Permissive),
            "reject" => Ok(Self::Reject),
            other => Err(DomainError::InvalidInput(format!(
                "unknown cycle policy {other:?}, expected \"permissive\" or \"reject\""
            ))),
        }
    }
}

/// Options applied when a script is validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptPolicy {
    /// Treatment of loops.
    pub cycles: CyclePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

struct Painter<'a> {
    blocks: &'a BTreeMap<u32, Block>,
    cycles: CyclePolicy,
    colors: HashMap<u32, Color>,
}

impl<'a> Painter<'a> {
    fn new(blocks: &'a BTreeMap<u32, Block>, cycles: CyclePolicy) -> Self {
        Self {
            blocks,
            cycles,
            colors: HashMap::new(),
        }
    }

    /// Colors everything reachable from `root`.
    fn paint_from(&mut self, root: u32) -> Result<(), DomainError> {
        // (state, index of the next successor to look at)
        let mut stack: Vec<(u32, usize)> = Vec::new();
        self.discover(root, &mut stack)?;

        while let Some(top) = stack.last_mut() {
            let (state, cursor) = *top;
            let block = self
                .blocks
                .get(&state)
                .ok_or(DomainError::BlockNotFound(state))?;
            if let Some(next) = block.successors().nth(cursor) {
                top.1 += 1;
                self.discover(next, &mut stack)?;
            } else {
                self.colors.insert(state, Color::Black);
                stack.pop();
            }
        }
        Ok(())
    }

    fn discover(&mut self, state: u32, stack: &mut Vec<(u32, usize)>) -> Result<(), DomainError> {
        if state == FINISH {
            return Ok(());
        }
        if !self.blocks.contains_key(&state) {
            return Err(DomainError::BlockNotFound(state));
        }
        match self.colors.get(&state) {
            None => {
                self.colors.insert(state, Color::Grey);
                stack.push((state, 0));
                Ok(())
            }
            Some(Color::Grey) if self.cycles == CyclePolicy::Reject => {
                Err(DomainError::CycleDetected(state))
            }
            Some(Color::Grey | Color::Black) => Ok(()),
        }
    }

    fn painted(&self) -> BTreeSet<u32> {
        self.colors.keys().copied().collect()
    }
}

/// Checks that every block is reachable from some entry point and that every
/// edge on the way targets an existing block or `0`.
///
/// Entry points are traversed in key order, so the reported error is stable.
///
/// # Errors
///
/// - `DomainError::BlockNotFound` when an entry point or edge targets a
///   missing state.
/// - `DomainError::CycleDetected` when `policy` rejects loops and one exists.
/// - `DomainError::UnusedBlock` for the lowest state no entry point reaches.
pub fn validate(
    entry_points: &BTreeMap<String, EntryPoint>,
    blocks: &BTreeMap<u32, Block>,
    policy: ScriptPolicy,
) -> Result<(), DomainError> {
    let mut painter = Painter::new(blocks, policy.cycles);
    for entry in entry_points.values() {
        painter.paint_from(entry.state)?;
    }

    let painted = painter.painted();
    if let Some(unused) = blocks.keys().find(|state| !painted.contains(state)) {
        return Err(DomainError::UnusedBlock(*unused));
    }
    Ok(())
}

/// Returns every state reachable from `root`, `root` included. `0` yields an
/// empty set.
///
/// # Errors
///
/// Returns `DomainError::BlockNotFound` if the traversal meets a missing
/// state.
pub fn reachable_from(blocks: &BTreeMap<u32, Block>, root: u32) -> Result<BTreeSet<u32>, DomainError> {
    let mut painter = Painter::new(blocks, CyclePolicy::Permissive);
    painter.paint_from(root)?;
    Ok(painter.painted())
}
