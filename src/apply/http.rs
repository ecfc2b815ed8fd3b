//! HTTP apply client.
//!
//! Thin reqwest wrapper over the three apply endpoints under one base url:
//! `POST {base}/rotate`, `POST {base}/delete`, `POST {base}/reorder`.
//! Receipt parsing is a pure function for testability.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::config::ApplyTimeouts;
use super::{ApplyError, ApplyReceipt, DeletionPayload, OrderPayload, PageApply, RotationPayload};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpApplyClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApplyClient {
    /// # Errors
    ///
    /// Returns [`ApplyError::HttpClientBuild`] if the reqwest client cannot be built.
    pub fn new(base_url: impl Into<String>, timeouts: ApplyTimeouts) -> Result<Self, ApplyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApplyError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into() })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, ApplyError> {
        let url = self.endpoint(path);
        debug!(%url, "apply request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApplyError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApplyError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ApplyError::Response { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl PageApply for HttpApplyClient {
    async fn apply_rotations(&self, payload: &RotationPayload) -> Result<(), ApplyError> {
        self.post("rotate", &RotateRequest { rotations: payload })
            .await
            .map(|_| ())
    }

    async fn apply_deletions(&self, payload: &DeletionPayload) -> Result<(), ApplyError> {
        self.post("delete", &DeleteRequest { deletions: payload })
            .await
            .map(|_| ())
    }

    async fn apply_order(&self, payload: &OrderPayload) -> Result<ApplyReceipt, ApplyError> {
        let text = self.post("reorder", &ReorderRequest { order: payload }).await?;
        parse_receipt(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct RotateRequest<'a> {
    rotations: &'a RotationPayload,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    deletions: &'a DeletionPayload,
}

#[derive(Serialize)]
struct ReorderRequest<'a> {
    order: &'a OrderPayload,
}

// =============================================================================
// PARSING
// =============================================================================

/// An empty body is a plain acknowledgement with no artifact.
fn parse_receipt(text: &str) -> Result<ApplyReceipt, ApplyError> {
    if text.trim().is_empty() {
        return Ok(ApplyReceipt::default());
    }
    serde_json::from_str(text).map_err(|e| ApplyError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
