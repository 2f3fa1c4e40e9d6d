//! Error types for the hub client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use hub_client::{Client, Endpoint, Result};
//!
//! async fn example() -> Result<()> {
//!     let client = Client::new(Endpoint::localhost(1997))?;
//!     let body = client.post("status", ()).await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectionClosed`] |
//! | Hub | [`Error::Hub`] |
//! | Protocol | [`Error::Protocol`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |
//!
//! Transport failures are never delivered to pending requests: the
//! connection task retries them. Only [`Error::Hub`] reaches a caller as
//! the outcome of a request the hub actually answered.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the endpoint or client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The client's connection task is gone.
    ///
    /// Returned by a pending reply once the connection task has stopped,
    /// after every client handle was dropped.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Hub Errors
    // ========================================================================
    /// The hub answered the request with an error.
    #[error("Hub error: {message}")]
    Hub {
        /// Error string reported by the hub.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a hub error.
    #[inline]
    pub fn hub(message: impl Into<String>) -> Self {
        Self::Hub {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the hub rejected the request.
    #[inline]
    #[must_use]
    pub fn is_hub_error(&self) -> bool {
        matches!(self, Self::Hub { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::WebSocket(_))
    }

    /// Returns the hub's error string, if this is a hub error.
    #[inline]
    #[must_use]
    pub fn hub_message(&self) -> Option<&str> {
        match self {
            Self::Hub { message } => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
