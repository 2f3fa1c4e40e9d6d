//! Client construction and the request submission API.
//!
//! Use [`Client::builder()`] or [`Client::new`] to create a client.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent client configuration |
//! | `core` | [`Client`] handle, [`PendingReply`] |
//! | `endpoint` | Hub address and environment defaults |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Client handle and request submission.
pub mod core;

/// Hub endpoint configuration.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use self::core::{Client, PendingReply};
pub use endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint, PORT_ENV_VAR};
