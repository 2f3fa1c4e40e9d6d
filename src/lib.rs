//! Hub Client - Resilient multiplexed request/response client.
//!
//! This library lets many independent callers share one persistent
//! WebSocket connection to a local hub service, correlating each reply to
//! its request by id.
//!
//! # Architecture
//!
//! The client follows a handle/task model:
//!
//! - **Client handles**: register requests and return immediately
//! - **Connection task**: owns the socket, sends requests, dispatches replies
//!
//! Key design principles:
//!
//! - One connection per [`Client`], shared by all clones
//! - Requests are registered before they are sent, so nothing is lost on a
//!   disconnect: every unanswered request is replayed as one batch after
//!   the next successful connect
//! - Reconnection is automatic and unbounded, with a fixed delay
//! - No timeouts and no cancellation; correlation is purely by id
//!
//! # Quick Start
//!
//! ```no_run
//! use hub_client::{Client, Endpoint, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Port from HUBPORT, falling back to 1997
//!     let client = Client::new(Endpoint::from_env()?)?;
//!
//!     let body = client.post("ping", ()).await?;
//!     println!("hub replied: {body}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`], [`Endpoint`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | Connection lifecycle (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Client construction and request submission.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Handles the connection lifecycle, request registry and reply dispatch.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, Endpoint, PendingReply};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::RequestId;

// Transport types
pub use transport::{Callback, ConnectionState};
