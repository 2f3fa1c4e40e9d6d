//! Hub client handle and request submission.
//!
//! # Example
//!
//! ```no_run
//! use hub_client::{Client, Endpoint};
//! use serde_json::json;
//!
//! # async fn example() -> hub_client::Result<()> {
//! let client = Client::new(Endpoint::from_env()?)?;
//!
//! // Future-based: success body or the hub's error.
//! let status = client.post("status", ()).await?;
//!
//! // Callback-based: runs on success only.
//! client.fast_post("log", json!({"line": "hello"}), |body| {
//!     println!("logged: {body}");
//! });
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::Request;
use crate::transport::{Completion, ConnectionCommand, ConnectionManager, ConnectionState, Shared};

use super::builder::ClientBuilder;
use super::endpoint::Endpoint;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Hub address.
    endpoint: Endpoint,
    /// Registry and connection state, shared with the connection task.
    shared: Arc<Shared>,
    /// Channel into the connection task.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

// ============================================================================
// Client
// ============================================================================

/// Multiplexed request/response client for the hub.
///
/// Cheap to clone; all clones share one connection and one registry. The
/// background connection task stops when the last clone is dropped.
///
/// Requests are never timed out or cancelled: a request waits in the
/// registry, surviving any number of reconnects, until the hub answers it.
/// Callers that need a deadline should wrap the [`PendingReply`] in
/// [`tokio::time::timeout`].
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client for `endpoint` with default settings.
    ///
    /// Connecting starts immediately in the background; requests can be
    /// submitted right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is invalid or no tokio
    /// runtime is running.
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Self::builder().endpoint(endpoint).build()
    }

    /// Creates the shared state and spawns the connection task.
    pub(crate) fn spawn(endpoint: Endpoint, reconnect_delay: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("Client must be created inside a tokio runtime"))?;

        let shared = Arc::new(Shared::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let manager = ConnectionManager::new(
            endpoint.ws_url(),
            reconnect_delay,
            Arc::clone(&shared),
            command_rx,
        );
        runtime.spawn(manager.run());

        debug!(%endpoint, ?reconnect_delay, "Client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint,
                shared,
                command_tx,
            }),
        })
    }
}

// ============================================================================
// Client - Submission
// ============================================================================

impl Client {
    /// Submits a request and returns a future for its reply.
    ///
    /// The request is registered before this returns. It is sent now if
    /// connected, otherwise with the next reconnect's replay batch. Pass
    /// `()` for a request without a body.
    ///
    /// The returned [`PendingReply`] resolves to the response body, or to
    /// [`Error::Hub`] with the hub's error string.
    pub fn post(&self, path: impl Into<String>, body: impl Serialize) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let id = self.submit(path.into(), serde_json::to_value(body), Completion::Future(tx));
        PendingReply { id, rx }
    }

    /// Submits a request whose successful reply is passed to `callback`.
    ///
    /// Same registration and sending as [`post`](Self::post). If the hub
    /// answers with an error the callback is never called and the error is
    /// discarded. The callback runs on the connection task and should not
    /// block; a panic inside it is caught and logged.
    pub fn fast_post<F>(
        &self,
        path: impl Into<String>,
        body: impl Serialize,
        callback: F,
    ) -> RequestId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.submit(
            path.into(),
            serde_json::to_value(body),
            Completion::Callback(Box::new(callback)),
        )
    }

    /// Submits a request and deserializes the reply body into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::Hub`] if the hub answered with an error
    /// - [`Error::Json`] if the body could not be encoded or the reply
    ///   could not be decoded into `T`
    /// - [`Error::ConnectionClosed`] if the connection task is gone
    pub async fn call<T>(&self, path: impl Into<String>, body: impl Serialize) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.post(path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Allocates an id, registers the request and hands it to the
    /// connection task.
    fn submit(
        &self,
        path: String,
        body: serde_json::Result<Value>,
        completion: Completion,
    ) -> RequestId {
        let mut registry = self.inner.shared.registry.lock();
        let id = registry.allocate();

        let body = match body {
            Ok(body) => body,
            Err(e) => {
                drop(registry);
                completion.fail(Error::Json(e));
                return id;
            }
        };

        let request = Request::new(id, path, body);
        registry.insert(request.clone(), completion);
        drop(registry);

        if self
            .inner
            .command_tx
            .send(ConnectionCommand::Transmit(request))
            .is_err()
        {
            warn!(%id, "Connection task gone, request will never be sent");
        }

        id
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Returns the hub endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state()
    }

    /// Returns `true` if the connection is up.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the number of requests awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.shared.registry.lock().len()
    }

    /// Waits until the connection is up and pending requests were replayed.
    ///
    /// Returns immediately if already connected.
    pub async fn wait_connected(&self) {
        let mut state_rx = self.inner.shared.subscribe();
        // The sender lives in `shared`, which `self` keeps alive.
        let _ = state_rx
            .wait_for(|state| *state == ConnectionState::Connected)
            .await;
    }
}

// ============================================================================
// PendingReply
// ============================================================================

/// Future returned by [`Client::post`].
///
/// Dropping it does not withdraw the request; the hub's reply is simply
/// discarded when it arrives.
#[derive(Debug)]
#[must_use = "the reply is only observable by awaiting it"]
pub struct PendingReply {
    /// Id of the submitted request.
    id: RequestId,
    /// Receives the outcome from the dispatcher.
    rx: oneshot::Receiver<Result<Value>>,
}

impl PendingReply {
    /// Returns the id assigned to the request.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for PendingReply {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the connection task and its registry are gone.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::ConnectionClosed)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::time::timeout;

    use crate::transport::test_hub::{TEST_TIMEOUT, TestHub, init_tracing};

    /// Short delay so reconnect scenarios finish quickly.
    const TEST_RECONNECT_DELAY: Duration = Duration::from_millis(50);

    fn client_for(port: u16) -> Client {
        init_tracing();
        Client::builder()
            .port(port)
            .reconnect_delay(TEST_RECONNECT_DELAY)
            .build()
            .expect("build client")
    }

    async fn connected(client: &Client) {
        timeout(TEST_TIMEOUT, client.wait_connected())
            .await
            .expect("client did not connect");
    }

    #[tokio::test]
    async fn test_post_while_connected_sends_single_object() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let reply = client.post("ping", ());
        assert_eq!(reply.id(), RequestId::FIRST);

        assert_eq!(conn.recv_json().await, json!({"id": 0, "path": "ping"}));
        conn.send_json(&json!({"id": 0, "body": "pong"})).await;

        let body = timeout(TEST_TIMEOUT, reply).await.expect("reply").expect("ok");
        assert_eq!(body, json!("pong"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_reply_rejects_post() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let reply = client.post("agents/kill", json!({"name": "x"}));
        assert_eq!(
            conn.recv_json().await,
            json!({"id": 0, "path": "agents/kill", "body": {"name": "x"}})
        );
        conn.send_json(&json!({"id": 0, "error": "no such agent"})).await;

        let err = timeout(TEST_TIMEOUT, reply).await.expect("reply").unwrap_err();
        assert_eq!(err.hub_message(), Some("no such agent"));
    }

    #[tokio::test]
    async fn test_requests_while_disconnected_are_replayed_as_one_batch() {
        let port = TestHub::unused_port().await;
        let client = client_for(port);

        let a = client.post("a", ());
        let b = client.post("b", json!(2));
        assert_eq!((a.id(), b.id()), (RequestId::new(0), RequestId::new(1)));
        assert_eq!(client.pending_count(), 2);
        assert!(!client.is_connected());

        let hub = TestHub::bind_port(port).await;
        let mut conn = hub.accept().await;

        assert_eq!(
            conn.recv_json().await,
            json!([{"id": 0, "path": "a"}, {"id": 1, "path": "b", "body": 2}])
        );
        connected(&client).await;
        // Neither request is sent again on this connection.
        conn.expect_silence(Duration::from_millis(100)).await;

        conn.send_json(&json!([{"id": 1, "body": "b"}, {"id": 0, "body": "a"}]))
            .await;

        assert_eq!(timeout(TEST_TIMEOUT, a).await.expect("a").expect("ok"), json!("a"));
        assert_eq!(timeout(TEST_TIMEOUT, b).await.expect("b").expect("ok"), json!("b"));
    }

    #[tokio::test]
    async fn test_unanswered_request_is_retransmitted_after_drop() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let reply = client.post("ping", ());
        assert_eq!(conn.recv_json().await, json!({"id": 0, "path": "ping"}));
        conn.close().await;

        let mut conn = hub.accept().await;
        assert_eq!(conn.recv_json().await, json!([{"id": 0, "path": "ping"}]));
        assert_eq!(client.pending_count(), 1);

        conn.send_json(&json!({"id": 0, "body": "pong"})).await;
        let body = timeout(TEST_TIMEOUT, reply).await.expect("reply").expect("ok");
        assert_eq!(body, json!("pong"));
    }

    #[tokio::test]
    async fn test_reconnect_with_nothing_pending_sends_nothing() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let conn = hub.accept().await;
        connected(&client).await;
        conn.close().await;

        let mut conn = hub.accept().await;
        conn.expect_silence(Duration::from_millis(100)).await;
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_fast_post_callback() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let (tx, rx) = oneshot::channel();
        let failing = client.fast_post("fail", (), |_| panic!("callback must not run on error"));
        let id = client.fast_post("ok", json!([1]), move |body| {
            let _ = tx.send(body);
        });
        assert_eq!((failing, id), (RequestId::new(0), RequestId::new(1)));

        assert_eq!(conn.recv_json().await, json!({"id": 0, "path": "fail"}));
        assert_eq!(conn.recv_json().await, json!({"id": 1, "path": "ok", "body": [1]}));

        conn.send_json(&json!({"id": 0, "error": "denied"})).await;
        conn.send_json(&json!({"id": 1, "body": "done"})).await;

        let body = timeout(TEST_TIMEOUT, rx).await.expect("callback").expect("ran");
        assert_eq!(body, json!("done"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_ids_and_garbage_are_ignored() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let reply = client.post("ping", ());
        conn.recv_json().await;

        conn.send_text("this is not json").await;
        conn.send_json(&json!({"id": 42, "body": "stray"})).await;
        conn.send_json(&json!([{"nope": 1}, {"id": 0, "body": "pong"}])).await;
        conn.send_json(&json!({"id": 0, "body": "duplicate"})).await;

        let body = timeout(TEST_TIMEOUT, reply).await.expect("reply").expect("ok");
        assert_eq!(body, json!("pong"));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_ids_increase_across_states() {
        let port = TestHub::unused_port().await;
        let client = client_for(port);

        let first = client.post("a", ());
        let second = client.fast_post("b", (), |_| {});

        let hub = TestHub::bind_port(port).await;
        let mut conn = hub.accept().await;
        conn.recv_json().await;
        connected(&client).await;

        let third = client.post("c", ());
        assert_eq!(
            [first.id(), second, third.id()],
            [RequestId::new(0), RequestId::new(1), RequestId::new(2)]
        );
        assert_eq!(conn.recv_json().await, json!({"id": 2, "path": "c"}));
    }

    #[tokio::test]
    async fn test_call_decodes_typed_body() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Status {
            agents: u32,
        }

        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.call::<Status>("status", ()).await }
        });

        assert_eq!(conn.recv_json().await, json!({"id": 0, "path": "status"}));
        conn.send_json(&json!({"id": 0, "body": {"agents": 3}})).await;

        let status = timeout(TEST_TIMEOUT, call)
            .await
            .expect("call")
            .expect("join")
            .expect("ok");
        assert_eq!(status, Status { agents: 3 });
    }

    #[tokio::test]
    async fn test_unserializable_body_fails_future() {
        use std::collections::HashMap;

        let port = TestHub::unused_port().await;
        let client = client_for(port);

        // Non-string map keys cannot be encoded as JSON.
        let body: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let reply = client.post("bad", body);
        assert_eq!(reply.id(), RequestId::FIRST);

        let err = reply.await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.post("next", ()).id(), RequestId::new(1));
    }

    #[tokio::test]
    async fn test_dropping_client_ends_pending_replies() {
        let port = TestHub::unused_port().await;
        let client = client_for(port);

        let reply = client.post("never", ());
        drop(client);

        let err = timeout(TEST_TIMEOUT, reply).await.expect("resolved").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_panicking_callback_leaves_client_usable() {
        let hub = TestHub::bind().await;
        let client = client_for(hub.port());
        let mut conn = hub.accept().await;
        connected(&client).await;

        client.fast_post("boom", (), |_| panic!("callback failed"));
        assert_eq!(conn.recv_json().await, json!({"id": 0, "path": "boom"}));
        conn.send_json(&json!({"id": 0, "body": 1})).await;

        let reply = client.post("ping", ());
        assert_eq!(conn.recv_json().await, json!({"id": 1, "path": "ping"}));
        conn.send_json(&json!({"id": 1, "body": "pong"})).await;

        let body = timeout(TEST_TIMEOUT, reply).await.expect("reply").expect("ok");
        assert_eq!(body, json!("pong"));
        assert!(client.is_connected());
        assert_eq!(client.pending_count(), 0);
    }
}
