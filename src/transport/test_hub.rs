//! In-process hub for end-to-end tests.
//!
//! Binds a plain WebSocket server on localhost and exposes each accepted
//! connection so tests can read what the client sent and script replies.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for anything a test waits on.
pub(crate) const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// TestHub
// ============================================================================

/// WebSocket server standing in for the hub.
pub(crate) struct TestHub {
    listener: TcpListener,
    port: u16,
}

impl TestHub {
    /// Binds to a random localhost port.
    pub async fn bind() -> Self {
        Self::bind_port(0).await
    }

    /// Binds to a specific localhost port.
    pub async fn bind_port(port: u16) -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let listener = TcpListener::bind(addr).await.expect("bind test hub");
        let port = listener.local_addr().expect("local addr").port();
        Self { listener, port }
    }

    /// Returns a port nothing listens on (at the time of the call).
    pub async fn unused_port() -> u16 {
        Self::bind().await.port
    }

    /// Returns the bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accepts the next client connection and completes the upgrade.
    pub async fn accept(&self) -> HubConnection {
        let (stream, _) = timeout(TEST_TIMEOUT, self.listener.accept())
            .await
            .expect("client did not connect in time")
            .expect("accept");
        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket upgrade");
        HubConnection { ws_stream }
    }
}

// ============================================================================
// HubConnection
// ============================================================================

/// One accepted client connection.
pub(crate) struct HubConnection {
    ws_stream: WebSocketStream<TcpStream>,
}

impl HubConnection {
    /// Receives the next text message, parsed as JSON.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = timeout(TEST_TIMEOUT, self.ws_stream.next())
                .await
                .expect("no message in time")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).expect("client sent invalid JSON");
            }
        }
    }

    /// Asserts nothing arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(Some(Ok(Message::Text(text)))) = timeout(window, self.ws_stream.next()).await {
            panic!("unexpected message from client: {}", text.as_str());
        }
    }

    /// Sends a raw text message.
    pub async fn send_text(&mut self, text: &str) {
        self.ws_stream
            .send(Message::Text(text.to_owned().into()))
            .await
            .expect("send to client");
    }

    /// Sends a JSON value.
    pub async fn send_json(&mut self, value: &Value) {
        self.send_text(&value.to_string()).await;
    }

    /// Closes the connection from the hub side.
    pub async fn close(mut self) {
        let _ = self.ws_stream.close(None).await;
    }
}

/// Installs a test subscriber honoring `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
