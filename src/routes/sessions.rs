//! Edit session routes.
//!
//! A remote UI drives one session per open document: it posts each gesture
//! as it happens, then posts the live page order to save. The session lock is
//! released while the apply calls are in flight, and those calls run on a
//! spawned task so a dropped request still lands its outcome on the session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::edits::changes::Change;
use crate::edits::{EditEvent, PageId};
use crate::error::{ErrorCode, error_body};
use crate::services::reconcile::{self, Page, SaveError, SaveReport};
use crate::services::session::{EditSession, SaveTicket, SessionError, SessionPhase};
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::BadRequest(_) => "E_BAD_REQUEST",
            Self::Session(e) => e.error_code(),
            Self::Internal(_) => "E_INTERNAL",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Session(e) if e.retryable())
    }
}

pub(crate) fn api_error_to_status(err: &ApiError) -> StatusCode {
    match err {
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ApiError::Session(SessionError::SaveInProgress) => StatusCode::CONFLICT,
        ApiError::Session(SessionError::Save(_)) => StatusCode::BAD_GATEWAY,
        ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = error_body(&self);
        if let Self::Session(SessionError::Save(e)) = &self {
            body["stage"] = json!(e.stage);
        }
        (api_error_to_status(&self), Json(body)).into_response()
    }
}

fn save_warning_json(err: &SaveError) -> Value {
    let mut body = error_body(err);
    body["stage"] = json!(err.stage);
    body
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub has_unsaved_changes: bool,
    pub change_count: usize,
    pub download_url: Option<String>,
}

fn summarize(id: Uuid, session: &EditSession) -> SessionSummary {
    SessionSummary {
        id,
        phase: session.phase(),
        has_unsaved_changes: session.has_unsaved_changes(),
        change_count: session.state().log().len(),
        download_url: session.last_download_url().map(str::to_owned),
    }
}

#[derive(Debug, Deserialize)]
pub struct RotateBody {
    pub page_id: PageId,
    /// Absolute angle in degrees.
    pub angle: Option<i32>,
    /// Degrees to add to the pending rotation.
    pub delta: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    pub page_id: PageId,
    pub url: String,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub page_id: PageId,
    pub old_index: usize,
    pub new_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SaveBody {
    /// Live page collection in current display order.
    pub pages: Vec<Page>,
}

fn rotate_event(body: RotateBody) -> Result<EditEvent, ApiError> {
    match (body.angle, body.delta) {
        (Some(angle), None) => Ok(EditEvent::Rotate { page_id: body.page_id, angle }),
        (None, Some(delta)) => Ok(EditEvent::RotateBy { page_id: body.page_id, delta }),
        _ => Err(ApiError::BadRequest("exactly one of `angle` or `delta` is required".into())),
    }
}

fn save_response(report: &SaveReport) -> Value {
    json!({
        "ok": true,
        "download_url": report.download_url,
        "stale": report.stale,
        "warnings": report.warnings.iter().map(save_warning_json).collect::<Vec<_>>(),
    })
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/sessions` — open an empty edit session.
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionSummary>) {
    let id = Uuid::new_v4();
    let session = EditSession::new();
    let summary = summarize(id, &session);
    state.sessions.write().await.insert(id, session);
    info!(session_id = %id, "session created");
    (StatusCode::CREATED, Json(summary))
}

/// `GET /api/sessions/:id` — phase and unsaved-changes flag.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::NotFound(id))?;
    Ok(Json(summarize(id, session)))
}

/// `DELETE /api/sessions/:id` — drop a session and everything staged in it.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(ApiError::NotFound(id))?;
    info!(session_id = %id, "session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/sessions/:id/changes` — staged changes in log order.
pub async fn list_changes(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<Change>>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(ApiError::NotFound(id))?;
    Ok(Json(session.changes().cloned().collect()))
}

async fn record(state: &AppState, id: Uuid, event: EditEvent) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
    let recorded = session.record(&event)?;
    if !recorded {
        warn!(session_id = %id, page_id = event.page_id(), "edit ignored for deleted page");
    }
    Ok(Json(json!({
        "recorded": recorded,
        "has_unsaved_changes": session.has_unsaved_changes(),
    })))
}

/// `POST /api/sessions/:id/rotate` — `{page_id, angle}` or `{page_id, delta}`.
pub async fn rotate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RotateBody>,
) -> Result<Json<Value>, ApiError> {
    let event = rotate_event(body)?;
    record(&state, id, event).await
}

/// `POST /api/sessions/:id/delete` — `{page_id, url, index?}`.
pub async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DeleteBody>,
) -> Result<Json<Value>, ApiError> {
    let event = EditEvent::Delete { page_id: body.page_id, url: body.url, index: body.index };
    record(&state, id, event).await
}

/// `POST /api/sessions/:id/reorder` — `{page_id, old_index, new_index}`.
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReorderBody>,
) -> Result<Json<Value>, ApiError> {
    let event = EditEvent::Reorder { page_id: body.page_id, old_index: body.old_index, new_index: body.new_index };
    record(&state, id, event).await
}

/// `POST /api/sessions/:id/save` — reconcile against `{pages}` and apply.
pub async fn save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SaveBody>,
) -> Result<Json<Value>, ApiError> {
    let ticket = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
        session.begin_save(&body.pages)?
    };
    let Some(ticket) = ticket else {
        return Ok(Json(save_response(&SaveReport::default())));
    };

    let report = tokio::spawn(run_save(state, id, ticket))
        .await
        .map_err(|e| ApiError::Internal(format!("save task failed: {e}")))??;
    if report.stale {
        warn!(session_id = %id, "save landed after discard; artifact reflects discarded edits");
    } else {
        info!(session_id = %id, download_url = ?report.download_url, "session saved");
    }
    Ok(Json(save_response(&report)))
}

/// Apply calls plus `finish_save`. Runs detached from the request so the
/// session always leaves `Saving`.
async fn run_save(state: AppState, id: Uuid, ticket: SaveTicket) -> Result<SaveReport, SessionError> {
    let result = reconcile::execute(&ticket.plan, state.applier.as_ref(), state.partial_failure).await;

    let mut sessions = state.sessions.write().await;
    match sessions.get_mut(&id) {
        Some(session) => session.finish_save(ticket, result),
        None => {
            warn!(session_id = %id, "session closed while saving");
            result.map_err(SessionError::from)
        }
    }
}

/// `POST /api/sessions/:id/discard` — drop staged edits without applying them.
pub async fn discard(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionSummary>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
    session.discard();
    info!(session_id = %id, "staged edits discarded");
    Ok(Json(summarize(id, session)))
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
