use std::collections::VecDeque;

use crate::canvas::Document;
use crate::error::{EditError, EditResult};

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

// ============================================================================
// HISTORY ENTRY - a full, independent copy of the document
// ============================================================================

/// A saved document state plus the label of the action that followed it.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub description: String,
    pub snapshot: Document,
}

impl HistoryEntry {
    pub fn capture(document: &Document, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            snapshot: document.clone(),
        }
    }

    pub fn memory_size(&self) -> usize {
        self.snapshot.memory_size() + self.description.len()
    }
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

/// Linear undo/redo over whole-document snapshots.
///
/// Gesture boundaries are the caller's business: checkpoint once when a
/// stroke starts, not once per cell.
#[derive(Clone, Debug)]
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            max_memory_bytes: None,
            total_memory: 0,
        }
    }

    /// Additionally evict old entries once the stacks exceed `bytes`.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Save the current document before a mutation. Clears redo.
    ///
    /// Returns the new entry. Pruning never evicts it, since at least one
    /// step is always kept.
    pub fn checkpoint(
        &mut self,
        document: &Document,
        description: impl Into<String>,
    ) -> &HistoryEntry {
        for entry in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(entry.memory_size());
        }

        let entry = HistoryEntry::capture(document, description);
        self.total_memory += entry.memory_size();
        self.undo_stack.push_back(entry);

        self.prune();
        let newest = self.undo_stack.len() - 1;
        &self.undo_stack[newest]
    }

    /// Restore the newest checkpoint, keeping the current state for redo.
    /// Returns the description of the undone action.
    pub fn undo(&mut self, document: &mut Document) -> EditResult<String> {
        let entry = self.undo_stack.pop_back().ok_or(EditError::NothingToUndo)?;
        let description = entry.description.clone();
        let current = std::mem::replace(document, entry.snapshot);
        self.total_memory = self
            .total_memory
            .saturating_sub(description.len() + document.memory_size());

        let redo = HistoryEntry {
            description: description.clone(),
            snapshot: current,
        };
        self.total_memory += redo.memory_size();
        self.redo_stack.push_back(redo);
        tracing::debug!("Undo: {}", description);
        Ok(description)
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self, document: &mut Document) -> EditResult<String> {
        let entry = self.redo_stack.pop_back().ok_or(EditError::NothingToRedo)?;
        let description = entry.description.clone();
        let current = std::mem::replace(document, entry.snapshot);
        self.total_memory = self
            .total_memory
            .saturating_sub(description.len() + document.memory_size());

        let undo = HistoryEntry {
            description: description.clone(),
            snapshot: current,
        };
        self.total_memory += undo.memory_size();
        self.undo_stack.push_back(undo);
        tracing::debug!("Redo: {}", description);
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// All undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|e| e.description.clone()).collect()
    }

    /// Approximate bytes held by both stacks.
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    /// Prune old entries to stay within limits
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                tracing::trace!("History full, evicted '{}'", removed.description);
            }
        }

        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    /// Undo `steps` times, stopping early when history runs out.
    /// Returns how many steps were taken.
    pub fn undo_to(&mut self, steps: usize, document: &mut Document) -> usize {
        let mut taken = 0;
        while taken < steps && self.undo(document).is_ok() {
            taken += 1;
        }
        taken
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
