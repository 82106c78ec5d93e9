//! Undo/redo history.
//!
//! Each doc-changing transaction records the inverse of its steps plus the
//! selection it started from. Undo replays those inverses as a new
//! transaction, so undo and redo go through [`EditorState::apply`] like any
//! other change and keep placeholders mapped.

use std::time::Duration;

use web_time::Instant;

use crate::state::{EditorState, Transaction};
use crate::types::Selection;

/// Default number of undo steps kept.
pub const DEFAULT_DEPTH: usize = 100;

/// Grouped transactions further apart than this start a new entry.
pub const GROUP_DELAY: Duration = Duration::from_millis(500);

/// Marks transactions produced by undo or redo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOp {
    Undo,
    Redo,
}

/// A recorded change for undo/redo.
#[derive(Debug, Clone)]
struct HistoryEntry {
    /// Inverse steps, in the order they were recorded
    inverted: Vec<crate::transform::Step>,
    /// Selection before the change
    selection_before: Selection,
    group: Option<&'static str>,
    time: Instant,
}

impl HistoryEntry {
    fn from_transaction(tr: &Transaction, selection_before: Selection) -> Self {
        Self {
            inverted: tr.inverted().to_vec(),
            selection_before,
            group: tr.history_group(),
            time: tr.time(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    done: Vec<HistoryEntry>,
    undone: Vec<HistoryEntry>,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            max_depth,
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    /// History after `tr` has been applied to a state whose selection was
    /// `selection_before`.
    pub(crate) fn apply(&self, tr: &Transaction, selection_before: Selection) -> History {
        let mut next = self.clone();
        match tr.history_op() {
            Some(HistoryOp::Undo) => {
                if next.done.pop().is_some() {
                    next.undone
                        .push(HistoryEntry::from_transaction(tr, selection_before));
                }
            }
            Some(HistoryOp::Redo) => {
                if next.undone.pop().is_some() {
                    next.done
                        .push(HistoryEntry::from_transaction(tr, selection_before));
                }
            }
            None if !tr.doc_changed() => {}
            None if !tr.add_to_history() => {
                // Steps we can't undo invalidate everything recorded before them.
                next.done.clear();
                next.undone.clear();
            }
            None => {
                next.undone.clear();
                let merged = match (next.done.last_mut(), tr.history_group()) {
                    (Some(last), Some(group))
                        if last.group == Some(group)
                            && tr.time().duration_since(last.time) <= GROUP_DELAY =>
                    {
                        last.inverted.extend_from_slice(tr.inverted());
                        last.time = tr.time();
                        true
                    }
                    _ => false,
                };
                if !merged {
                    next.done
                        .push(HistoryEntry::from_transaction(tr, selection_before));
                }
                // Trim if over max
                while next.done.len() > next.max_depth {
                    next.done.remove(0);
                }
            }
        }
        next
    }

    pub(crate) fn undo_transaction(&self, state: &EditorState) -> Option<Transaction> {
        Self::replay(self.done.last()?, state, HistoryOp::Undo)
    }

    pub(crate) fn redo_transaction(&self, state: &EditorState) -> Option<Transaction> {
        Self::replay(self.undone.last()?, state, HistoryOp::Redo)
    }

    fn replay(entry: &HistoryEntry, state: &EditorState, op: HistoryOp) -> Option<Transaction> {
        let mut tr = state.tr();
        for step in entry.inverted.iter().rev() {
            if let Err(e) = tr.step(step.clone()) {
                tracing::warn!(target: "tapwrite::history", error = %e, ?op, "history entry no longer applies");
                return None;
            }
        }
        tr.set_selection(entry.selection_before);
        tr.set_history_op(op);
        Some(tr)
    }
}
