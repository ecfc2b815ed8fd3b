//! Change log — the coalesced record of staged page edits.
//!
//! DESIGN
//! ======
//! The log is ordered by a monotonically increasing token, but it is never
//! scanned to find an entry: each page has at most one pending rotate and one
//! pending reorder, addressed through per-kind token indexes, plus the set of
//! pages already deleted. Coalescing is therefore a keyed upsert.
//!
//! - Rotate: replaced in place, so its log position survives repeated clicks.
//!   A normalized angle of 0 removes the entry.
//! - Reorder: removed and re-appended; `old_index` stays pinned to the first
//!   position the tracker ever saw for that page.
//! - Delete: purges every other entry for the page and blocks later edits.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use super::PageId;
use super::positions::{AffectedPosition, PositionTracker};

pub type ChangeToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Rotate,
    Delete,
    Reorder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangePayload {
    Rotate {
        image_id: PageId,
        /// Normalized to `[0, 360)`; never 0 while stored.
        angle_degrees: u16,
    },
    Delete {
        image_id: PageId,
        /// Captured at delete time; the page is gone from the live collection afterwards.
        image_url: String,
    },
    Reorder {
        image_id: PageId,
        old_index: usize,
        new_index: usize,
        affected: Vec<AffectedPosition>,
    },
}

impl ChangePayload {
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Rotate { .. } => ChangeKind::Rotate,
            Self::Delete { .. } => ChangeKind::Delete,
            Self::Reorder { .. } => ChangeKind::Reorder,
        }
    }

    #[must_use]
    pub fn image_id(&self) -> &str {
        match self {
            Self::Rotate { image_id, .. } | Self::Delete { image_id, .. } | Self::Reorder { image_id, .. } => image_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub id: ChangeToken,
    #[serde(flatten)]
    pub payload: ChangePayload,
    /// Milliseconds since Unix epoch.
    pub recorded_at: i64,
}

/// Normalize any angle in degrees to `[0, 360)`.
#[must_use]
pub fn normalize_angle(raw: i32) -> u16 {
    u16::try_from(raw.rem_euclid(360)).unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    entries: BTreeMap<ChangeToken, Change>,
    rotates: HashMap<PageId, ChangeToken>,
    reorders: HashMap<PageId, ChangeToken>,
    deleted: HashMap<PageId, ChangeToken>,
    last_token: ChangeToken,
}

impl ChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an absolute rotation. Returns `false` when the page is already deleted.
    pub fn record_rotate(&mut self, id: &str, raw_angle: i32, at: i64) -> bool {
        if self.is_deleted(id) {
            warn!(page_id = id, "ignoring rotate for deleted page");
            return false;
        }

        let angle_degrees = normalize_angle(raw_angle);
        if angle_degrees == 0 {
            if let Some(token) = self.rotates.remove(id) {
                self.entries.remove(&token);
                debug!(page_id = id, "rotation back to 0 cleared pending rotate");
            }
            return true;
        }

        let payload = ChangePayload::Rotate { image_id: id.to_owned(), angle_degrees };
        if let Some(entry) = self
            .rotates
            .get(id)
            .and_then(|token| self.entries.get_mut(token))
        {
            entry.payload = payload;
            entry.recorded_at = at;
            return true;
        }

        let token = self.append(payload, at);
        self.rotates.insert(id.to_owned(), token);
        true
    }

    /// Stage a rotation relative to whatever is already pending for the page.
    pub fn rotate_by(&mut self, id: &str, delta: i32, at: i64) -> bool {
        let base = self.pending_rotation(id).map_or(0, i32::from);
        self.record_rotate(id, base + delta.rem_euclid(360), at)
    }

    /// Stage a deletion. The tracker shift uses the page's tracked position,
    /// falling back to `index_hint` for pages that were never moved.
    pub fn record_delete(
        &mut self,
        positions: &mut PositionTracker,
        id: &str,
        url: &str,
        index_hint: Option<usize>,
        at: i64,
    ) -> bool {
        if self.is_deleted(id) {
            debug!(page_id = id, "page already deleted");
            return false;
        }

        positions.apply_deletion_shift(positions.current(id).or(index_hint));

        for token in [self.rotates.remove(id), self.reorders.remove(id)]
            .into_iter()
            .flatten()
        {
            self.entries.remove(&token);
        }

        let token = self.append(ChangePayload::Delete { image_id: id.to_owned(), image_url: url.to_owned() }, at);
        self.deleted.insert(id.to_owned(), token);
        true
    }

    /// Stage a move. Repeated moves of one page coalesce into a single entry
    /// spanning its first recorded position to its latest one.
    pub fn record_reorder(
        &mut self,
        positions: &mut PositionTracker,
        id: &str,
        old_index: usize,
        new_index: usize,
        at: i64,
    ) -> bool {
        if self.is_deleted(id) {
            warn!(page_id = id, "ignoring reorder for deleted page");
            return false;
        }

        positions.store_original_if_absent(id, old_index);
        positions.set_current(id, new_index);
        let pinned_old_index = positions.original(id).unwrap_or(old_index);

        if let Some(token) = self.reorders.remove(id) {
            self.entries.remove(&token);
        }

        let affected: Vec<AffectedPosition> = positions
            .affected_except(id)
            .filter(|a| !self.deleted.contains_key(&a.image_id))
            .collect();

        let token = self.append(
            ChangePayload::Reorder { image_id: id.to_owned(), old_index: pinned_old_index, new_index, affected },
            at,
        );
        self.reorders.insert(id.to_owned(), token);
        true
    }

    #[must_use]
    pub fn pending_rotation(&self, id: &str) -> Option<u16> {
        let token = self.rotates.get(id)?;
        match self.entries.get(token)?.payload {
            ChangePayload::Rotate { angle_degrees, .. } => Some(angle_degrees),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains_key(id)
    }

    /// Entries in log order.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Tokens keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.rotates.clear();
        self.reorders.clear();
        self.deleted.clear();
    }

    fn append(&mut self, payload: ChangePayload, at: i64) -> ChangeToken {
        self.last_token += 1;
        let token = self.last_token;
        self.entries.insert(token, Change { id: token, payload, recorded_at: at });
        token
    }
}

#[cfg(test)]
#[path = "changes_test.rs"]
mod tests;
