//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the live edit sessions, the apply client every save goes through,
//! and the partial-failure policy. Sessions live only in memory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::apply::PageApply;
use crate::apply::config::PartialFailurePolicy;
use crate::services::session::EditSession;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, EditSession>>>,
    pub applier: Arc<dyn PageApply>,
    pub partial_failure: PartialFailurePolicy,
}

impl AppState {
    #[must_use]
    pub fn new(applier: Arc<dyn PageApply>, partial_failure: PartialFailurePolicy) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), applier, partial_failure }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
