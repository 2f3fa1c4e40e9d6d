//! Outbound request messages.
//!
//! Requests are sent one JSON object at a time while connected, and as a
//! single JSON array when pending requests are replayed after a reconnect.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, to_string};

use crate::error::Result;
use crate::identifiers::RequestId;

// ============================================================================
// Request
// ============================================================================

/// A request from the client to the hub.
///
/// # Format
///
/// ```json
/// { "id": 0, "path": "status", "body": { ... } }
/// ```
///
/// `body` is omitted when the caller supplied none (or `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Opaque operation name.
    pub path: String,

    /// Opaque payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Request {
    /// Creates a request, treating a `null` body as absent.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, path: impl Into<String>, body: Value) -> Self {
        Self {
            id,
            path: path.into(),
            body: (!body.is_null()).then_some(body),
        }
    }

    /// Encodes this request as a single JSON text message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Batch Encoding
// ============================================================================

/// Encodes a replay batch as one JSON array text message.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if encoding fails.
pub fn encode_batch(requests: &[Request]) -> Result<String> {
    Ok(to_string(requests)?)
}

// ============================================================================
// Tests
// ============================================================================
