//! WebSocket protocol message types.
//!
//! This module defines the message format exchanged with the hub.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Hub | Call `path` with an opaque `body` |
//! | `Response` | Hub → Client | `body` or `error` for one request id |
//!
//! Both directions allow a single JSON object or a JSON array of them.
//! The client only sends arrays when replaying after a reconnect.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Request type and batch encoding |
//! | `response` | Response type and lenient decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Request message type.
pub mod request;

/// Response message type.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::{Request, encode_batch};
pub use response::{Response, decode_responses};
