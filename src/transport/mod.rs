//! WebSocket transport layer.
//!
//! This module handles the single multiplexed connection between the
//! client (Rust) and the hub, including request correlation and replay.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Client handles      │                         │  Hub            │
//! │  post / fast_post    │                         │                 │
//! │        │             │        WebSocket        │                 │
//! │  Registry ◄─ Dispatcher ◄──────────────────────│                 │
//! │        │             │                         │                 │
//! │  ConnectionManager ──┼────────────────────────►│                 │
//! └──────────────────────┘    ws://host:PORT       └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ConnectionManager::run` - Connect to `ws://host:port`
//! 2. Replay every pending request as one JSON array
//! 3. Forward new requests singly, dispatch responses by id
//! 4. On close or error, wait the reconnect delay and go to 1
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection lifecycle and event loop |
//! | `dispatcher` | Inbound message routing |
//! | `registry` | Pending request registry |

// ============================================================================
// Submodules
// ============================================================================

/// Connection lifecycle and event loop.
pub mod connection;

/// Inbound message routing.
pub(crate) mod dispatcher;

/// Pending request registry.
pub(crate) mod registry;

/// In-process hub for tests.
#[cfg(test)]
pub(crate) mod test_hub;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionState, DEFAULT_RECONNECT_DELAY};
pub use registry::Callback;
pub(crate) use connection::{ConnectionCommand, ConnectionManager, Shared};
pub(crate) use registry::Completion;
