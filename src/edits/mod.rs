//! Edits — staged, not-yet-applied page edits.
//!
//! DESIGN
//! ======
//! The change log and the position tracker move together, so they live in
//! one `EditState` value with a single transition function. Callers describe
//! what the user did as an `EditEvent`; `EditState::apply` updates the
//! tracker and coalesces the log in one step.

pub mod changes;
pub mod positions;

use serde::Deserialize;

use changes::ChangeLog;
use positions::PositionTracker;

/// Opaque page identifier assigned by the upload collaborator.
pub type PageId = String;

/// A discrete user action against the page collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditEvent {
    /// Set the page's pending rotation to an absolute angle.
    Rotate { page_id: PageId, angle: i32 },
    /// Add `delta` degrees to the page's pending rotation.
    RotateBy { page_id: PageId, delta: i32 },
    Delete {
        page_id: PageId,
        url: String,
        /// Display index at delete time, used when the page was never moved.
        #[serde(default)]
        index: Option<usize>,
    },
    Reorder { page_id: PageId, old_index: usize, new_index: usize },
}

impl EditEvent {
    #[must_use]
    pub fn page_id(&self) -> &str {
        match self {
            Self::Rotate { page_id, .. }
            | Self::RotateBy { page_id, .. }
            | Self::Delete { page_id, .. }
            | Self::Reorder { page_id, .. } => page_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditState {
    log: ChangeLog,
    positions: PositionTracker,
}

impl EditState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event at time `at` (ms since epoch). Returns `false` when the
    /// event was ignored because its page is already deleted.
    pub fn apply(&mut self, event: &EditEvent, at: i64) -> bool {
        match event {
            EditEvent::Rotate { page_id, angle } => self.log.record_rotate(page_id, *angle, at),
            EditEvent::RotateBy { page_id, delta } => self.log.rotate_by(page_id, *delta, at),
            EditEvent::Delete { page_id, url, index } => {
                self.log
                    .record_delete(&mut self.positions, page_id, url, *index, at)
            }
            EditEvent::Reorder { page_id, old_index, new_index } => {
                self.log
                    .record_reorder(&mut self.positions, page_id, *old_index, *new_index, at)
            }
        }
    }

    /// By-value form of [`EditState::apply`].
    #[must_use]
    pub fn reduce(mut self, event: &EditEvent, at: i64) -> Self {
        self.apply(event, at);
        self
    }

    #[must_use]
    pub fn log(&self) -> &ChangeLog {
        &self.log
    }

    #[must_use]
    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.positions.reset();
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
