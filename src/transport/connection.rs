//! WebSocket connection lifecycle and event loop.
//!
//! One task per client owns the socket. It connects, replays every pending
//! request as a single batch, forwards new requests while the connection is
//! up, hands inbound frames to the dispatcher, and on any termination waits
//! the reconnect delay and starts over.
//!
//! # Event Loop
//!
//! ```text
//!            ┌────────────────────────────────────────────┐
//!            ▼                                            │
//!   Disconnected ──► Connecting ──► Connected ──(close)───┤
//!                        │                                │
//!                        └──────────(refused)─────────────┘
//! ```
//!
//! There is no terminal state: the loop runs until every client handle is
//! dropped.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::protocol::{Request, encode_batch};

use super::dispatcher::dispatch;
use super::registry::Registry;

// ============================================================================
// Constants
// ============================================================================

/// Delay between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream to the hub.
type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of [`HubStream`].
type HubSink = SplitSink<HubStream, Message>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the hub connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket; waiting for the reconnect delay to elapse.
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Socket open. Pending requests are replayed right after entering
    /// this state.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between client handles and the connection task.
pub(crate) struct Shared {
    /// Pending requests and the id counter.
    pub registry: Mutex<Registry>,
    /// Current connection state.
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    /// Creates empty shared state in the disconnected state.
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            registry: Mutex::new(Registry::new()),
            state,
        }
    }

    /// Returns the current connection state.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribes to connection state changes.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!(%previous, %state, "Connection state changed");
        }
    }
}

/// Marks the connection as down when the connection task exits, including
/// by unwinding.
struct StateReset(Arc<Shared>);

impl Drop for StateReset {
    fn drop(&mut self) {
        self.0.set_state(ConnectionState::Disconnected);
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Commands from client handles to the connection task.
pub(crate) enum ConnectionCommand {
    /// Send a freshly registered request if connected.
    Transmit(Request),
}

/// Why a live connection ended.
enum Disconnect {
    /// The socket closed or failed; reconnect.
    Dropped,
    /// Every client handle is gone; stop.
    ClientGone,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owns the hub socket for one client.
pub(crate) struct ConnectionManager {
    /// `ws://host:port` of the hub.
    url: String,
    /// Wait between a disconnect and the next attempt.
    reconnect_delay: Duration,
    /// Registry and state shared with client handles.
    shared: Arc<Shared>,
    /// Commands from client handles.
    command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl ConnectionManager {
    /// Creates the manager. Nothing happens until [`run`](Self::run) is polled.
    pub fn new(
        url: String,
        reconnect_delay: Duration,
        shared: Arc<Shared>,
        command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> Self {
        Self {
            url,
            reconnect_delay,
            shared,
            command_rx,
        }
    }

    /// Connect/serve/reconnect loop.
    ///
    /// Returns once the command channel closes, i.e. every client handle
    /// has been dropped.
    pub async fn run(mut self) {
        let _reset = StateReset(Arc::clone(&self.shared));

        loop {
            self.shared.set_state(ConnectionState::Connecting);
            debug!(url = %self.url, "Connecting to hub");

            match self.establish().await {
                None => break,
                Some(Ok(ws_stream)) => {
                    info!(url = %self.url, "WebSocket connection established");
                    if let Disconnect::ClientGone = self.serve(ws_stream).await {
                        break;
                    }
                }
                Some(Err(e)) => {
                    debug!(url = %self.url, error = %e, "Connection attempt failed");
                }
            }

            self.shared.set_state(ConnectionState::Disconnected);
            debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                pending = self.shared.registry.lock().len(),
                "Disconnected, reconnect scheduled"
            );

            if !self.wait_reconnect_delay().await {
                break;
            }
        }

        debug!("Connection task terminated");
    }

    /// Opens the socket.
    ///
    /// Returns `None` if the client went away while connecting.
    async fn establish(&mut self) -> Option<StdResult<HubStream, WsError>> {
        let connect = connect_async(self.url.clone());
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => {
                    return Some(result.map(|(ws_stream, _)| ws_stream));
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => Self::defer(command),
                    None => return None,
                },
            }
        }
    }

    /// Sleeps for the reconnect delay.
    ///
    /// Returns `false` if the client went away in the meantime.
    async fn wait_reconnect_delay(&mut self) -> bool {
        let delay = sleep(self.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                () = &mut delay => return true,

                command = self.command_rx.recv() => match command {
                    Some(command) => Self::defer(command),
                    None => return false,
                },
            }
        }
    }

    /// Drops a command received while not connected.
    ///
    /// The request is still in the registry and goes out with the next
    /// replay batch.
    fn defer(command: ConnectionCommand) {
        match command {
            ConnectionCommand::Transmit(request) => {
                trace!(id = %request.id, "Not connected, request deferred to replay");
            }
        }
    }

    /// Runs one live connection until it ends.
    async fn serve(&mut self, ws_stream: HubStream) -> Disconnect {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        // Everything below the watermark is in this batch; later
        // `Transmit` commands for those ids are stale.
        let (batch, watermark) = {
            let registry = self.shared.registry.lock();
            (registry.snapshot(), registry.next_id())
        };

        self.shared.set_state(ConnectionState::Connected);

        if !batch.is_empty() {
            if let Err(e) = Self::replay(&mut ws_write, &batch).await {
                warn!(error = %e, count = batch.len(), "Failed to send replay batch");
                return Disconnect::Dropped;
            }
            debug!(count = batch.len(), "Replayed pending requests");
        }

        loop {
            tokio::select! {
                // Incoming messages from the hub
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            dispatch(&text, &self.shared.registry);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by hub");
                            return Disconnect::Dropped;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            return Disconnect::Dropped;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return Disconnect::Dropped;
                        }

                        // Ignore Binary, Ping, Pong
                        Some(Ok(_)) => {
                            trace!("Ignoring non-text frame");
                        }
                    }
                }

                // Requests from client handles
                command = self.command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Transmit(request)) if request.id < watermark => {
                            trace!(id = %request.id, "Request already sent in replay batch");
                        }

                        Some(ConnectionCommand::Transmit(request)) => {
                            if let Err(e) = Self::transmit(&mut ws_write, &request).await {
                                warn!(id = %request.id, error = %e, "Failed to send request");
                                return Disconnect::Dropped;
                            }
                        }

                        None => {
                            debug!("All client handles dropped, closing connection");
                            let _ = ws_write.close().await;
                            return Disconnect::ClientGone;
                        }
                    }
                }
            }
        }
    }

    /// Sends all pending requests as one array message.
    async fn replay(ws_write: &mut HubSink, batch: &[Request]) -> Result<()> {
        let json = encode_batch(batch)?;
        ws_write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Sends one request as a single object message.
    async fn transmit(ws_write: &mut HubSink, request: &Request) -> Result<()> {
        let json = request.to_json()?;
        ws_write.send(Message::Text(json.into())).await?;
        trace!(id = %request.id, path = %request.path, "Request sent");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
