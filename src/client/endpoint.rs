//! Hub endpoint configuration.
//!
//! The client itself only takes an explicit [`Endpoint`]. Environment-based
//! defaulting is offered here for the calling layer to opt into.
//!
//! # Example
//!
//! ```
//! use hub_client::Endpoint;
//!
//! let endpoint = Endpoint::parse("ws://127.0.0.1:4000").unwrap();
//! assert_eq!(endpoint.port(), 4000);
//! assert_eq!(endpoint.ws_url(), "ws://127.0.0.1:4000");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env::{self, VarError};
use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Host the hub listens on.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when [`PORT_ENV_VAR`] is unset.
pub const DEFAULT_PORT: u16 = 1997;

/// Environment variable selecting the hub port.
pub const PORT_ENV_VAR: &str = "HUBPORT";

// ============================================================================
// Endpoint
// ============================================================================

/// Address of the hub's WebSocket server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP literal.
    host: String,
    /// TCP port.
    port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::localhost(DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bracketed_host(), self.port)
    }
}

// ============================================================================
// Endpoint - Constructors
// ============================================================================

impl Endpoint {
    /// Creates an endpoint from host and port.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Creates an endpoint on [`DEFAULT_HOST`].
    #[inline]
    #[must_use]
    pub fn localhost(port: u16) -> Self {
        Self::new(DEFAULT_HOST, port)
    }

    /// Parses a `ws://host:port` URL.
    ///
    /// A missing port means the scheme default (80).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid, not `ws://`, has no
    /// host, or carries a path, query or fragment.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed =
            Url::parse(url).map_err(|e| Error::config(format!("Invalid hub URL '{url}': {e}")))?;

        if parsed.scheme() != "ws" {
            return Err(Error::config(format!(
                "Unsupported hub URL scheme '{}', expected 'ws'",
                parsed.scheme()
            )));
        }

        if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Error::config(format!(
                "Hub URL must not carry a path, query or fragment: {url}"
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::config(format!("Hub URL has no host: {url}")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| Error::config(format!("Hub URL has no port: {url}")))?;

        Ok(Self::new(host, port))
    }

    /// Builds the default endpoint for this process.
    ///
    /// Uses [`DEFAULT_HOST`] and the port from the [`PORT_ENV_VAR`]
    /// environment variable, falling back to [`DEFAULT_PORT`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is set but is not a valid
    /// port number.
    pub fn from_env() -> Result<Self> {
        let value = match env::var(PORT_ENV_VAR) {
            Ok(value) => Some(value),
            Err(VarError::NotPresent) => None,
            Err(VarError::NotUnicode(_)) => {
                return Err(Error::config(format!("{PORT_ENV_VAR} is not valid unicode")));
            }
        };

        Ok(Self::localhost(port_from_env_value(value.as_deref())?))
    }
}

// ============================================================================
// Endpoint - Accessors
// ============================================================================

impl Endpoint {
    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL for this endpoint.
    ///
    /// Format: `ws://{host}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{self}")
    }

    /// Host with IPv6 literals wrapped in brackets.
    fn bracketed_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves the hub port from the raw environment value.
fn port_from_env_value(value: Option<&str>) -> Result<u16> {
    let Some(value) = value else {
        return Ok(DEFAULT_PORT);
    };

    value.trim().parse().map_err(|_| {
        Error::config(format!("{PORT_ENV_VAR} must be a port number, got '{value}'"))
    })
}

// ============================================================================
// Tests
// ============================================================================
