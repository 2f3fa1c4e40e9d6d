//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use hub_client::Client;
//!
//! # async fn example() -> hub_client::Result<()> {
//! let client = Client::builder()
//!     .port(1997)
//!     .reconnect_delay(Duration::from_millis(250))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::DEFAULT_RECONNECT_DELAY;

use super::core::Client;
use super::endpoint::{DEFAULT_HOST, Endpoint};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Hub host.
    host: Option<String>,
    /// Hub port.
    port: Option<u16>,
    /// Wait between a disconnect and the next connection attempt.
    reconnect_delay: Option<Duration>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new client builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets host and port from an [`Endpoint`].
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.host = Some(endpoint.host().to_string());
        self.port = Some(endpoint.port());
        self
    }

    /// Sets the hub host. Defaults to [`DEFAULT_HOST`].
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the hub port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the delay before each reconnection attempt.
    ///
    /// Defaults to [`DEFAULT_RECONNECT_DELAY`] (1s).
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Builds the client and starts connecting in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no port was set, the host is empty, or the
    ///   port or reconnect delay is zero
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn build(self) -> Result<Client> {
        let endpoint = self.validate_endpoint()?;
        let reconnect_delay = self.validate_reconnect_delay()?;

        Client::spawn(endpoint, reconnect_delay)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint configuration.
    fn validate_endpoint(&self) -> Result<Endpoint> {
        let port = self.port.ok_or_else(|| {
            Error::config(
                "Hub port is required. Use .port() or .endpoint() to set it.\n\
                 Example: Client::builder().endpoint(Endpoint::from_env()?)",
            )
        })?;

        if port == 0 {
            return Err(Error::config("Hub port must not be 0"));
        }

        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST).trim();
        if host.is_empty() {
            return Err(Error::config("Hub host must not be empty"));
        }

        Ok(Endpoint::new(host, port))
    }

    /// Validates the reconnect delay.
    fn validate_reconnect_delay(&self) -> Result<Duration> {
        let delay = self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY);
        if delay.is_zero() {
            return Err(Error::config("Reconnect delay must be greater than zero"));
        }
        Ok(delay)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = ClientBuilder::new();
        assert!(builder.host.is_none());
        assert!(builder.port.is_none());
        assert!(builder.reconnect_delay.is_none());
    }

    #[test]
    fn test_port_is_required() {
        let err = ClientBuilder::new().validate_endpoint().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(".port()"));
    }

    #[test]
    fn test_endpoint_validation() {
        let endpoint = ClientBuilder::new().port(4000).validate_endpoint().expect("valid");
        assert_eq!(endpoint, Endpoint::localhost(4000));

        let endpoint = ClientBuilder::new()
            .endpoint(Endpoint::new("hub.local", 81))
            .validate_endpoint()
            .expect("valid");
        assert_eq!(endpoint.ws_url(), "ws://hub.local:81");

        assert!(ClientBuilder::new().port(0).validate_endpoint().is_err());
        assert!(ClientBuilder::new().host(" ").port(1).validate_endpoint().is_err());
    }

    #[test]
    fn test_reconnect_delay_validation() {
        let delay = ClientBuilder::new().validate_reconnect_delay().expect("default");
        assert_eq!(delay, Duration::from_millis(1000));

        let delay = ClientBuilder::new()
            .reconnect_delay(Duration::from_millis(50))
            .validate_reconnect_delay()
            .expect("custom");
        assert_eq!(delay, Duration::from_millis(50));

        assert!(
            ClientBuilder::new()
                .reconnect_delay(Duration::ZERO)
                .validate_reconnect_delay()
                .is_err()
        );
    }

    #[test]
    fn test_build_outside_runtime() {
        let err = ClientBuilder::new().port(4000).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
