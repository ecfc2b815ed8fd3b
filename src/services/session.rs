//! Session service — one document's staged edits and its save lifecycle.
//!
//! DESIGN
//! ======
//! `EditSession` owns the `EditState` and walks a small state machine:
//!
//! ```text
//! Idle ──record──▶ Dirty ──begin_save──▶ Saving ──finish_save(ok)──▶ Idle
//!                    ▲                     │
//!                    └──finish_save(err)───┘        discard: any ──▶ Idle
//! ```
//!
//! Saving is split in two so a caller holding the session behind a lock can
//! release it across the network calls: `begin_save` snapshots the plan and
//! returns a ticket, `finish_save` applies the outcome. A discard bumps the
//! generation, so a save that lands after it cannot wipe newer edits.
//!
//! `in_flight` is tracked apart from the phase: after a discard the session is
//! editable again, but no second save may start until the outstanding ticket
//! comes back through `finish_save`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::apply::PageApply;
use crate::apply::config::PartialFailurePolicy;
use crate::edits::changes::Change;
use crate::edits::{EditEvent, EditState};
use crate::services::reconcile::{self, Page, SaveError, SavePlan, SaveReport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Dirty,
    Saving,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a save is already in progress")]
    SaveInProgress,
    #[error(transparent)]
    Save(#[from] SaveError),
}

impl crate::error::ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SaveInProgress => "E_SAVE_IN_PROGRESS",
            Self::Save(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::SaveInProgress => true,
            Self::Save(e) => e.retryable(),
        }
    }
}

/// Handed out by [`EditSession::begin_save`]; must be returned to
/// [`EditSession::finish_save`].
#[derive(Debug)]
pub struct SaveTicket {
    generation: u64,
    pub plan: SavePlan,
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct EditSession {
    state: EditState,
    phase: SessionPhase,
    generation: u64,
    /// Generation of the ticket whose apply calls are still running.
    in_flight: Option<u64>,
    last_download_url: Option<String>,
}

impl EditSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one user gesture. Returns whether it changed anything staged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SaveInProgress`] while a save is in flight.
    pub fn record(&mut self, event: &EditEvent) -> Result<bool, SessionError> {
        if self.phase == SessionPhase::Saving {
            return Err(SessionError::SaveInProgress);
        }
        let recorded = self.state.apply(event, now_ms());
        self.phase = if self.state.has_changes() { SessionPhase::Dirty } else { SessionPhase::Idle };
        Ok(recorded)
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.state.has_changes()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Staged changes in log order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.state.log().iter()
    }

    /// Artifact locator from the most recent successful save.
    #[must_use]
    pub fn last_download_url(&self) -> Option<&str> {
        self.last_download_url.as_deref()
    }

    /// Snapshot the save plan against the live `pages` and enter `Saving`.
    /// `Ok(None)` means there is nothing staged to save.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SaveInProgress`] if a save is already in flight,
    /// including one whose edits were discarded after it started.
    pub fn begin_save(&mut self, pages: &[Page]) -> Result<Option<SaveTicket>, SessionError> {
        if let Some(generation) = self.in_flight {
            debug!(ticket = generation, current = self.generation, "save rejected; ticket outstanding");
            return Err(SessionError::SaveInProgress);
        }
        match self.phase {
            SessionPhase::Saving => Err(SessionError::SaveInProgress),
            SessionPhase::Idle => Ok(None),
            SessionPhase::Dirty => {
                let plan = reconcile::build_plan(self.state.log(), pages);
                self.phase = SessionPhase::Saving;
                self.in_flight = Some(self.generation);
                debug!(changes = self.state.log().len(), generation = self.generation, "save started");
                Ok(Some(SaveTicket { generation: self.generation, plan }))
            }
        }
    }

    /// Apply the outcome of the apply calls made for `ticket`. On success the
    /// staged edits are cleared; on failure they are kept for a retry. A ticket
    /// from before a discard only releases the in-flight slot, and its report
    /// comes back marked `stale`.
    ///
    /// # Errors
    ///
    /// Returns the save failure wrapped in [`SessionError::Save`].
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<SaveReport, SaveError>,
    ) -> Result<SaveReport, SessionError> {
        if self.in_flight == Some(ticket.generation) {
            self.in_flight = None;
        }
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "save finished after discard; staged edits left untouched"
            );
            return result
                .map(|report| SaveReport { stale: true, ..report })
                .map_err(SessionError::from);
        }

        match result {
            Ok(report) => {
                self.state.clear();
                self.generation += 1;
                self.phase = SessionPhase::Idle;
                if report.download_url.is_some() {
                    self.last_download_url.clone_from(&report.download_url);
                }
                info!(has_artifact = report.download_url.is_some(), "save completed");
                Ok(report)
            }
            Err(err) => {
                self.phase = SessionPhase::Dirty;
                warn!(stage = %err.stage, error = %err.cause, "save failed; staged edits retained");
                Err(err.into())
            }
        }
    }

    /// Single-owner save: `begin_save`, the apply calls, then `finish_save`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SaveInProgress`] or the stage-tagged save failure.
    pub async fn save(
        &mut self,
        pages: &[Page],
        applier: &dyn PageApply,
        policy: PartialFailurePolicy,
    ) -> Result<SaveReport, SessionError> {
        let Some(ticket) = self.begin_save(pages)? else {
            return Ok(SaveReport::default());
        };
        let result = reconcile::execute(&ticket.plan, applier, policy).await;
        self.finish_save(ticket, result)
    }

    /// Drop every staged edit without transmitting anything. A save already in
    /// flight keeps running, but its outcome no longer touches this session.
    pub fn discard(&mut self) {
        self.state.clear();
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        debug!(generation = self.generation, "staged edits discarded");
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
