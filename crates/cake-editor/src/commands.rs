//! Undo/Redo command stack.
//!
//! Working states are cheap to snapshot (five `Arc` clones), so every
//! command simply records the state before and after. Undo and redo swap
//! the whole working state back in; nothing is replayed.
//!
//! Drag gestures (e.g. moving a message marker) use **batching**: the
//! snapshot is taken at the start of the gesture and one command is pushed
//! when it ends, so undo reverts the whole gesture in a single step.

use crate::store::{DesignMutation, DesignStore};
use cake_core::model::WorkingState;

/// A reversible change to the working state.
#[derive(Debug, Clone)]
pub struct Command {
    pub before: WorkingState,
    pub after: WorkingState,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Working state captured at the start of a batch.
    batch_snapshot: Option<WorkingState>,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    /// Start a batch group. All mutations until `end_batch()` are applied
    /// live but recorded as one undo step.
    pub fn begin_batch(&mut self, store: &DesignStore) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(store.working().clone());
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the working
    /// state changed, push one command.
    pub fn end_batch(&mut self, store: &DesignStore, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0
            && let Some(before) = self.batch_snapshot.take()
        {
            let after = store.working().clone();
            if !before.same_identity(&after) {
                self.push(Command {
                    before,
                    after,
                    description: description.to_string(),
                });
            }
        }
    }

    /// Apply a mutation to the store and record it. Returns whether the
    /// mutation applied.
    pub fn execute(
        &mut self,
        store: &mut DesignStore,
        mutation: DesignMutation,
        description: &str,
    ) -> bool {
        let before = store.working().clone();
        if !store.apply_mutation(mutation) {
            return false;
        }
        if self.batch_depth == 0 {
            let after = store.working().clone();
            self.push(Command {
                before,
                after,
                description: description.to_string(),
            });
        }
        true
    }

    fn push(&mut self, cmd: Command) {
        self.undo_stack.push(cmd);
        self.trim_to_depth();
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Change the maximum undo depth, dropping the oldest steps if the
    /// history is now too long.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
        self.trim_to_depth();
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn trim_to_depth(&mut self) {
        if self.undo_stack.len() > self.max_depth {
            let excess = self.undo_stack.len() - self.max_depth;
            self.undo_stack.drain(..excess);
        }
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, store: &mut DesignStore) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        store.restore(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, store: &mut DesignStore) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        store.restore(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    /// Drop all history (e.g. a new image was analysed).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
