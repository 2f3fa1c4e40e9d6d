//! In-flight request registry.
//!
//! The registry is the source of truth for which requests still await a
//! reply. It owns the id counter, so allocation and insertion happen under
//! the same lock and every id below [`Registry::next_id`] has already been
//! registered (or was never registrable).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Request, Response};

// ============================================================================
// Types
// ============================================================================

/// Success-only completion callback.
pub type Callback = Box<dyn FnOnce(Value) + Send + 'static>;

// ============================================================================
// Completion
// ============================================================================

/// How a pending request reports its outcome.
pub(crate) enum Completion {
    /// Two-branch completion backing a [`PendingReply`](crate::PendingReply).
    Future(oneshot::Sender<Result<Value>>),
    /// Success-only callback; failures are dropped.
    Callback(Callback),
}

impl Completion {
    /// Delivers a response to the caller.
    pub(crate) fn complete(self, response: Response) {
        let id = response.id;

        match (self, response.into_result()) {
            (Self::Future(tx), outcome) => {
                // Receiver may have been dropped by a caller that stopped waiting.
                let _ = tx.send(outcome);
            }
            (Self::Callback(callback), Ok(body)) => {
                // Callbacks run on the connection task and must not take it down.
                if panic::catch_unwind(AssertUnwindSafe(|| callback(body))).is_err() {
                    warn!(%id, "Completion callback panicked");
                }
            }
            (Self::Callback(_), Err(e)) => {
                debug!(%id, error = %e, "Dropping error for callback request");
            }
        }
    }

    /// Fails the request before it was ever registered.
    pub(crate) fn fail(self, error: Error) {
        match self {
            Self::Future(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::Callback(_) => {
                warn!(error = %error, "Dropping callback request that could not be built");
            }
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Future(_) => f.write_str("Completion::Future"),
            Self::Callback(_) => f.write_str("Completion::Callback"),
        }
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// One outstanding call.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    /// The request as it goes on the wire.
    pub request: Request,
    /// Where the outcome goes.
    pub completion: Completion,
}

// ============================================================================
// Registry
// ============================================================================

/// Mapping from request id to pending request.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    /// Next id to hand out.
    next_id: RequestId,
    /// Requests awaiting a reply.
    entries: FxHashMap<RequestId, PendingRequest>,
}

impl Registry {
    /// Creates an empty registry whose first id is 0.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the next id. Ids are never reused.
    #[inline]
    pub fn allocate(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Returns the id the next [`allocate`](Self::allocate) will hand out.
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> RequestId {
        self.next_id
    }

    /// Registers a request under its id.
    ///
    /// Ids come from [`allocate`](Self::allocate), so an existing entry is
    /// never overwritten.
    pub fn insert(&mut self, request: Request, completion: Completion) {
        let id = request.id;
        debug_assert!(id < self.next_id(), "id {id} was not allocated");
        debug_assert!(!self.entries.contains_key(&id), "id {id} registered twice");

        self.entries.insert(id, PendingRequest { request, completion });
    }

    /// Removes and returns the pending request for `id`.
    #[inline]
    pub fn take(&mut self, id: RequestId) -> Option<PendingRequest> {
        self.entries.remove(&id)
    }

    /// Returns `true` if `id` is still pending.
    #[cfg(test)]
    #[inline]
    #[must_use]
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns every pending request in submission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Request> {
        let mut batch: Vec<Request> = self
            .entries
            .values()
            .map(|pending| pending.request.clone())
            .collect();
        batch.sort_unstable_by_key(|request| request.id);
        batch
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    #[cfg(test)]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
