//! Staged page edits for multi-page documents.
//!
//! ARCHITECTURE
//! ============
//! - `edits`: the change log and position tracker, driven by `EditEvent`s.
//! - `services`: the save pipeline (`reconcile`) and per-document sessions.
//! - `apply`: the remote apply contract and its HTTP client.
//! - `routes` + `state`: the axum service a UI talks to.

pub mod apply;
pub mod edits;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
