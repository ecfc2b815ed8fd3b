//! Reconcile service — staged change log → remote apply calls.
//!
//! DESIGN
//! ======
//! `build_plan` is pure: it partitions the log by kind and derives the three
//! payloads. Rotations resolve page ids through the live collection, deletions
//! use the url captured at delete time, and the final order is read straight
//! from the live collection. Reorder entries are diagnostic only; replaying
//! them would duplicate (and could contradict) the live order.
//!
//! `execute` issues rotate, delete, then reorder. The reorder call is the
//! commit point: its failure always fails the save. What happens when rotate
//! or delete fails is decided by `PartialFailurePolicy`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::apply::config::PartialFailurePolicy;
use crate::apply::{ApplyError, DeletionPayload, OrderPayload, PageApply, RotationPayload};
use crate::edits::PageId;
use crate::edits::changes::{Change, ChangeKind, ChangeLog, ChangePayload};

// =============================================================================
// TYPES
// =============================================================================

/// One page of the live collection, in current display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    Rotate,
    Delete,
    Reorder,
}

impl SaveStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rotate => "rotate",
            Self::Delete => "delete",
            Self::Reorder => "reorder",
        }
    }
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed apply call, tagged with the stage that made it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} apply failed: {cause}")]
pub struct SaveError {
    pub stage: SaveStage,
    #[source]
    pub cause: ApplyError,
}

impl crate::error::ErrorCode for SaveError {
    fn error_code(&self) -> &'static str {
        match self.stage {
            SaveStage::Rotate => "E_ROTATE_APPLY_FAILED",
            SaveStage::Delete => "E_DELETE_APPLY_FAILED",
            SaveStage::Reorder => "E_REORDER_APPLY_FAILED",
        }
    }

    fn retryable(&self) -> bool {
        self.cause.retryable()
    }
}

/// Everything a save transmits, derived once from the log and live pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub rotations: RotationPayload,
    pub deletions: DeletionPayload,
    pub order: OrderPayload,
    /// Reorder entries seen in the log. Not transmitted.
    pub reorder_count: usize,
}

/// Result of a save that reached the order call and got a receipt.
#[derive(Debug, Default)]
pub struct SaveReport {
    /// Artifact locator; `None` is a plain acknowledgement.
    pub download_url: Option<String>,
    /// Stage failures tolerated under `PartialFailurePolicy::Continue`.
    pub warnings: Vec<SaveError>,
    /// Set when the edits this save carried were discarded before it landed.
    pub stale: bool,
}

// =============================================================================
// PLAN
// =============================================================================

struct Partitioned<'a> {
    rotates: Vec<&'a Change>,
    deletes: Vec<&'a Change>,
    reorders: Vec<&'a Change>,
}

fn partition(log: &ChangeLog) -> Partitioned<'_> {
    let mut parts = Partitioned { rotates: Vec::new(), deletes: Vec::new(), reorders: Vec::new() };
    for change in log.iter() {
        match change.payload.kind() {
            ChangeKind::Rotate => parts.rotates.push(change),
            ChangeKind::Delete => parts.deletes.push(change),
            ChangeKind::Reorder => parts.reorders.push(change),
        }
    }
    parts
}

/// Derive the three apply payloads from the log and the live page collection.
#[must_use]
pub fn build_plan(log: &ChangeLog, pages: &[Page]) -> SavePlan {
    let parts = partition(log);
    let urls: HashMap<&str, &str> = pages
        .iter()
        .map(|p| (p.id.as_str(), p.url.as_str()))
        .collect();

    let mut rotations = RotationPayload::default();
    for change in &parts.rotates {
        let ChangePayload::Rotate { image_id, angle_degrees } = &change.payload else {
            continue;
        };
        match urls.get(image_id.as_str()) {
            Some(url) => {
                rotations.0.insert((*url).to_owned(), *angle_degrees);
            }
            None => debug!(page_id = %image_id, "rotated page no longer in live collection; dropped"),
        }
    }

    let mut deletions = DeletionPayload::default();
    for change in &parts.deletes {
        if let ChangePayload::Delete { image_url, .. } = &change.payload {
            deletions.insert(image_url.as_str());
        }
    }

    for change in &parts.reorders {
        if let ChangePayload::Reorder { old_index, new_index, .. } = &change.payload {
            debug!(page_id = change.payload.image_id(), old_index, new_index, "reorder resolved by live order");
        }
    }
    let order = OrderPayload(pages.iter().map(|p| p.url.clone()).collect());

    SavePlan { rotations, deletions, order, reorder_count: parts.reorders.len() }
}

// =============================================================================
// EXECUTE
// =============================================================================

/// Decide what a rotate or delete outcome means for the rest of the save.
/// `Ok(())` means the pipeline may continue.
fn tolerate(
    stage: SaveStage,
    result: Result<(), ApplyError>,
    policy: PartialFailurePolicy,
    warnings: &mut Vec<SaveError>,
) -> Result<(), SaveError> {
    let Err(cause) = result else {
        return Ok(());
    };
    let err = SaveError { stage, cause };
    match policy {
        PartialFailurePolicy::Abort => {
            warn!(%stage, error = %err.cause, "apply failed; aborting save");
            Err(err)
        }
        PartialFailurePolicy::Continue => {
            warn!(%stage, error = %err.cause, "apply failed; continuing to reorder");
            warnings.push(err);
            Ok(())
        }
    }
}

/// Issue the apply calls for `plan` in fixed order.
///
/// # Errors
///
/// Returns a [`SaveError`] tagged `Reorder` when the order call fails, or
/// tagged `Rotate`/`Delete` when those fail under `PartialFailurePolicy::Abort`.
pub async fn execute(
    plan: &SavePlan,
    applier: &dyn PageApply,
    policy: PartialFailurePolicy,
) -> Result<SaveReport, SaveError> {
    let mut warnings = Vec::new();

    if !plan.rotations.is_empty() {
        let result = applier.apply_rotations(&plan.rotations).await;
        tolerate(SaveStage::Rotate, result, policy, &mut warnings)?;
    }

    if !plan.deletions.is_empty() {
        let result = applier.apply_deletions(&plan.deletions).await;
        tolerate(SaveStage::Delete, result, policy, &mut warnings)?;
    }

    let receipt = applier
        .apply_order(&plan.order)
        .await
        .map_err(|cause| SaveError { stage: SaveStage::Reorder, cause })?;

    info!(
        rotations = plan.rotations.0.len(),
        deletions = plan.deletions.0.len(),
        pages = plan.order.0.len(),
        warnings = warnings.len(),
        has_artifact = receipt.download_url.is_some(),
        "save applied"
    );

    Ok(SaveReport { download_url: receipt.download_url, warnings, stale: false })
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
