//! Position tracker — first-seen and latest index per page.
//!
//! DESIGN
//! ======
//! Two maps keyed by page id. `original` is write-once per id until a full
//! reset; `current` follows every move and shifts down when an earlier page
//! is deleted. `BTreeMap` keeps `affected` snapshots in a stable order.

use std::collections::BTreeMap;

use serde::Serialize;

use super::PageId;

/// One page's displacement at the time another page was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedPosition {
    pub image_id: PageId,
    pub original_position: usize,
    pub current_position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTracker {
    original: BTreeMap<PageId, usize>,
    current: BTreeMap<PageId, usize>,
}

impl PositionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_original_if_absent(&mut self, id: &str, index: usize) {
        if !self.original.contains_key(id) {
            self.original.insert(id.to_owned(), index);
        }
    }

    pub fn set_current(&mut self, id: &str, index: usize) {
        self.current.insert(id.to_owned(), index);
    }

    /// Close the gap left by a deleted page. `None` means the deleted page's
    /// position is unknown, in which case nothing moves.
    pub fn apply_deletion_shift(&mut self, deleted_index: Option<usize>) {
        let Some(deleted_index) = deleted_index else {
            return;
        };
        for position in self.current.values_mut() {
            if *position > deleted_index {
                *position -= 1;
            }
        }
    }

    pub fn reset(&mut self) {
        self.original.clear();
        self.current.clear();
    }

    #[must_use]
    pub fn original(&self, id: &str) -> Option<usize> {
        self.original.get(id).copied()
    }

    #[must_use]
    pub fn current(&self, id: &str) -> Option<usize> {
        self.current.get(id).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty() && self.current.is_empty()
    }

    /// Snapshot `(original, current)` for every tracked page other than `id`.
    /// Pages with only one of the two positions recorded are skipped.
    pub fn affected_except<'a>(&'a self, id: &'a str) -> impl Iterator<Item = AffectedPosition> + 'a {
        self.current
            .iter()
            .filter(move |(other, _)| other.as_str() != id)
            .filter_map(move |(other, &current_position)| {
                self.original.get(other).map(|&original_position| AffectedPosition {
                    image_id: other.clone(),
                    original_position,
                    current_position,
                })
            })
    }
}

#[cfg(test)]
#[path = "positions_test.rs"]
mod tests;
