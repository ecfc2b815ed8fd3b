//! Apply — the remote step that turns reconciled payloads into an artifact.
//!
//! DESIGN
//! ======
//! Three independent endpoints, one per edit kind. `PageApply` is the seam:
//! the save pipeline only sees the trait, `http::HttpApplyClient` talks to the
//! real service, and tests substitute a scripted mock.

pub mod config;
pub mod http;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// PAYLOADS
// =============================================================================

/// Page url -> normalized rotation in degrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RotationPayload(pub BTreeMap<String, u16>);

/// Set of page urls to drop, encoded as url -> `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeletionPayload(pub BTreeMap<String, bool>);

/// Page urls in final display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderPayload(pub Vec<String>);

impl RotationPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DeletionPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, url: impl Into<String>) {
        self.0.insert(url.into(), true);
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.0.contains_key(url)
    }
}

/// What the order-apply endpoint hands back. Both `download_url` and
/// `downloadUrl` are accepted; when a body carries both, the snake_case key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "WireReceipt")]
pub struct ApplyReceipt {
    /// Locator of the produced artifact, when the service produced one.
    pub download_url: Option<String>,
}

#[derive(Deserialize)]
struct WireReceipt {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default, rename = "downloadUrl")]
    download_url_camel: Option<String>,
}

impl From<WireReceipt> for ApplyReceipt {
    fn from(wire: WireReceipt) -> Self {
        Self { download_url: wire.download_url.or(wire.download_url_camel) }
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("apply request failed: {0}")]
    Request(String),

    /// The apply service answered with a non-success status.
    #[error("apply response error: status {status}")]
    Response { status: u16, body: String },

    /// The apply service answered with a body we could not decode.
    #[error("apply response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for ApplyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_APPLY_REQUEST",
            Self::Response { .. } => "E_APPLY_RESPONSE",
            Self::Parse(_) => "E_APPLY_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote apply contract. Enables mocking in tests.
#[async_trait::async_trait]
pub trait PageApply: Send + Sync {
    /// Apply pending rotations.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the request fails or is rejected.
    async fn apply_rotations(&self, payload: &RotationPayload) -> Result<(), ApplyError>;

    /// Drop deleted pages.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the request fails or is rejected.
    async fn apply_deletions(&self, payload: &DeletionPayload) -> Result<(), ApplyError>;

    /// Commit the final page order and produce the artifact.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if the request fails, is rejected, or the
    /// receipt cannot be decoded.
    async fn apply_order(&self, payload: &OrderPayload) -> Result<ApplyReceipt, ApplyError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
