//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The page viewer UI lives elsewhere; it talks to this service over JSON.
//! Every route below `/api/sessions/{id}` maps to one engine operation.

pub mod sessions;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/{id}/changes", get(sessions::list_changes))
        .route("/api/sessions/{id}/rotate", post(sessions::rotate))
        .route("/api/sessions/{id}/delete", post(sessions::delete_page))
        .route("/api/sessions/{id}/reorder", post(sessions::reorder))
        .route("/api/sessions/{id}/save", post(sessions::save))
        .route("/api/sessions/{id}/discard", post(sessions::discard))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
