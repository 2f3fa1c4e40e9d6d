//! Inbound response messages.
//!
//! The hub answers with either one response object or an array of them.
//! Decoding is lenient: array elements that do not look like a response are
//! skipped, and extra fields are ignored.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Response
// ============================================================================

/// A response from the hub to the client.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 0, "body": "pong" }
/// ```
///
/// Error:
/// ```json
/// { "id": 0, "error": "no such route" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Human-readable failure description (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: RequestId, body: Value) -> Self {
        Self {
            id,
            body: Some(body),
            error: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: RequestId, error: impl Into<String>) -> Self {
        Self {
            id,
            body: None,
            error: Some(error.into()),
        }
    }

    /// Returns `true` if this response reports a failure.
    ///
    /// An empty error string counts as no error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Extracts the body, or the hub's error.
    ///
    /// A missing body on success yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hub`] if the response was an error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(message) if !message.is_empty() => Err(Error::hub(message)),
            _ => Ok(self.body.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes an inbound text message into responses, in message order.
///
/// Batch elements that fail to decode are logged and skipped.
///
/// # Errors
///
/// - [`Error::Json`] if the text is not JSON, or a lone object is not a response
/// - [`Error::Protocol`] if the top-level value is neither object nor array
pub fn decode_responses(text: &str) -> Result<Vec<Response>> {
    match from_str::<Value>(text)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match from_value::<Response>(item) {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed response in batch");
                    None
                }
            })
            .collect()),
        value @ Value::Object(_) => Ok(vec![from_value(value)?]),
        other => Err(Error::protocol(format!(
            "expected response object or array, got {other}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
