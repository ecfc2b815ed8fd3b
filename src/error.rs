//! Error codes shared by every fallible surface.
//!
//! DESIGN
//! ======
//! Each concern owns a `thiserror` enum. Handlers never match on message
//! text: they ask the error for a grepable code and whether a retry makes
//! sense, then serialize both next to the display message.

use serde_json::{Value, json};

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON body for an error response: `{ code, message, retryable }`.
pub fn error_body<E: ErrorCode + ?Sized>(err: &E) -> Value {
    json!({
        "code": err.error_code(),
        "message": err.to_string(),
        "retryable": err.retryable(),
    })
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
