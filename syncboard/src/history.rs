//! Per-session linear undo/redo log.
//!
//! DESIGN
//! ======
//! The log is a single linear sequence of structural edits with a movable
//! cursor. Pushing while the cursor sits before the end truncates the tail
//! (new edits discard the redo branch). Undo/redo replay entries against the
//! session's surface in inverse/forward order; while a replay is in flight
//! the log refuses new pushes so replay-induced mutations are never
//! re-recorded.
//!
//! Replay is best-effort: a step whose target object has since vanished is
//! skipped with a diagnostic rather than failing the whole navigation.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use canvas::object::BoardObject;
use canvas::surface::DrawableSurface;
use tracing::debug;

/// Kind of structural edit a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    /// An object was added to the surface.
    Add,
    /// An object was removed from the surface.
    Remove,
    /// An object was replaced in place. Carries no inverse snapshot, so
    /// replaying it has no effect.
    Modify,
}

/// One recorded structural edit.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// What happened.
    pub action: HistoryAction,
    /// Snapshot of the affected object at record time.
    pub object: BoardObject,
    /// Monotonically increasing sequence number; survives truncation.
    pub seq: u64,
    /// Milliseconds since the Unix epoch at record time.
    pub ts: i64,
}

/// Whether the log is accepting new entries or replaying old ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LogMode {
    /// Normal operation: pushes append.
    #[default]
    Recording,
    /// An undo/redo replay is in flight: pushes are ignored.
    Replaying,
}

/// Linear undo/redo log for one session.
#[derive(Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    next_seq: u64,
    mode: LogMode,
}

impl HistoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a structural edit.
    ///
    /// Ignored while a replay is in flight. Otherwise truncates everything
    /// past the cursor, appends, and moves the cursor to the end.
    pub fn push(&mut self, action: HistoryAction, object: BoardObject) {
        if self.mode == LogMode::Replaying {
            return;
        }

        self.entries.truncate(self.cursor);
        self.entries.push(HistoryEntry {
            action,
            object,
            seq: self.next_seq,
            ts: frames::now_ms(),
        });
        self.next_seq += 1;
        self.cursor = self.entries.len();
    }

    /// Step the cursor back one entry, replaying its inverse against the
    /// surface. Returns `false` when there is nothing to undo.
    pub fn undo<S: DrawableSurface>(&mut self, surface: &mut S) -> bool {
        if self.cursor == 0 {
            return false;
        }

        self.mode = LogMode::Replaying;
        self.cursor -= 1;
        let entry = &self.entries[self.cursor];
        match entry.action {
            HistoryAction::Add => {
                if surface.remove(&entry.object.id).is_none() {
                    debug!(object = %entry.object.id, seq = entry.seq, "undo: target already gone; step skipped");
                }
            }
            HistoryAction::Remove => {
                surface.add(entry.object.clone());
            }
            HistoryAction::Modify => {
                debug!(object = %entry.object.id, seq = entry.seq, "undo: modify carries no inverse; step skipped");
            }
        }
        self.mode = LogMode::Recording;
        true
    }

    /// Step the cursor forward one entry, replaying it against the surface.
    /// Returns `false` when there is nothing to redo.
    pub fn redo<S: DrawableSurface>(&mut self, surface: &mut S) -> bool {
        if self.cursor == self.entries.len() {
            return false;
        }

        self.mode = LogMode::Replaying;
        let entry = &self.entries[self.cursor];
        match entry.action {
            HistoryAction::Add => {
                surface.add(entry.object.clone());
            }
            HistoryAction::Remove => {
                if surface.remove(&entry.object.id).is_none() {
                    debug!(object = %entry.object.id, seq = entry.seq, "redo: target already gone; step skipped");
                }
            }
            HistoryAction::Modify => {
                debug!(object = %entry.object.id, seq = entry.seq, "redo: modify carries no inverse; step skipped");
            }
        }
        self.cursor += 1;
        self.mode = LogMode::Recording;
        true
    }

    /// Empty the log and reset the cursor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Whether a backward step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a forward step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor position, in `0..=len`.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Force replay mode so tests can observe push suppression directly.
    #[cfg(test)]
    pub(crate) fn set_replaying_for_tests(&mut self) {
        self.mode = LogMode::Replaying;
    }
}
