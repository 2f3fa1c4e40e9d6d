//! Inbound message dispatch.
//!
//! Decodes text frames from the hub and completes the matching pending
//! requests. Nothing here ever fails outward: malformed frames and unknown
//! ids are logged and dropped, since the connection is long-lived.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::protocol::{Response, decode_responses};

use super::registry::Registry;

// ============================================================================
// Dispatch
// ============================================================================

/// Handles one inbound text message.
///
/// Returns the number of pending requests it completed.
pub(crate) fn dispatch(text: &str, registry: &Mutex<Registry>) -> usize {
    let responses = match decode_responses(text) {
        Ok(responses) => responses,
        Err(e) => {
            warn!(error = %e, len = text.len(), "Ignoring malformed message from hub");
            return 0;
        }
    };

    responses
        .into_iter()
        .map(|response| resolve(response, registry))
        .filter(|completed| *completed)
        .count()
}

/// Completes the pending request matching `response`, if any.
///
/// The record leaves the registry before its completion runs, so a
/// duplicate response for the same id finds nothing.
fn resolve(response: Response, registry: &Mutex<Registry>) -> bool {
    // Lock is released before the completion runs; callbacks may submit.
    let Some(pending) = registry.lock().take(response.id) else {
        trace!(id = %response.id, "Response for unknown request");
        return false;
    };

    trace!(id = %response.id, path = %pending.request.path, "Response received");
    pending.completion.complete(response);
    true
}

// ============================================================================
// Tests
// ============================================================================
