//! Conversation history.
//!
//! The [`ConversationContext`] is the literal prompt history sent with every
//! request, so insertion order matters.  It performs no validation: the
//! session decides what gets appended.

use crate::types::Turn;

/// An ordered, mutable turn history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history that starts with `seed`.
    pub fn with_seed(seed: Vec<Turn>) -> Self {
        Self { turns: seed }
    }

    /// Adds a turn at the end.  Role alternation is not checked.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replaces every turn with `seed`, or with nothing.
    ///
    /// The previous turns are dropped for good.
    pub fn reset(&mut self, seed: Option<Vec<Turn>>) {
        self.turns = seed.unwrap_or_default();
    }

    /// Returns a copy of the current turns.
    ///
    /// Later mutations of the context are not reflected in the copy.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Borrows the current turns.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when there are no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drops every turn past `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }
}
