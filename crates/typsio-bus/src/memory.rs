//! # In-Memory Link
//!
//! Two connected endpoints living in the same process. Each endpoint owns an
//! ordered inbound queue drained by a Tokio task that hands every event to the
//! endpoint's listeners, so delivery is asynchronous and FIFO per direction.
//!
//! ```text
//!   client endpoint                         server endpoint
//!  ┌───────────────┐   emit → queue B     ┌───────────────┐
//!  │ listeners (A) │ ───────────────────→ │ listeners (B) │
//!  │   ↑ pump A    │ ←─────────────────── │   ↑ pump B    │
//!  └───────────────┘   queue A ← emit     └───────────────┘
//! ```
//!
//! `disconnect()` and `reconnect()` simulate connection transitions. The local
//! `disconnect` / `connect` events bypass the queues: both endpoints' listeners
//! run before the transition call returns, so they never observe a transition
//! after a later one. A new session token is issued on every reconnect.

use crate::listeners::ListenerSet;
use crate::transport::{Listener, ListenerId, Transport, TransportError};
use crate::{CONNECT_EVENT, DISCONNECT_EVENT};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// An event travelling through an endpoint queue.
#[derive(Debug)]
struct Envelope {
    event: String,
    payload: Value,
}

/// Connection state shared by both endpoints of a link.
struct LinkState {
    connected: AtomicBool,
    session: RwLock<Option<String>>,
}

impl LinkState {
    fn new_connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            session: RwLock::new(Some(new_session_token())),
        }
    }
}

fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// One side of a [`MemoryLink`].
pub struct MemoryEndpoint {
    side: &'static str,
    state: Arc<LinkState>,
    listeners: Arc<ListenerSet>,
    peer_queue: mpsc::UnboundedSender<Envelope>,
    events_sent: AtomicU64,
}

impl MemoryEndpoint {
    /// Which side of the link this endpoint is ("client" or "server").
    #[must_use]
    pub fn side(&self) -> &'static str {
        self.side
    }

    /// Total events successfully handed to the peer.
    #[must_use]
    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    /// Number of listeners registered for `event` on this endpoint.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.count(event)
    }
}

impl Transport for MemoryEndpoint {
    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    fn session_id(&self) -> Option<String> {
        self.state.session.read().clone()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        self.peer_queue
            .send(Envelope {
                event: event.to_string(),
                payload,
            })
            .map_err(|_| TransportError::Closed)?;

        self.events_sent.fetch_add(1, Ordering::Relaxed);
        trace!(side = self.side, event = event, "Event emitted");
        Ok(())
    }

    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.listeners.add(event, listener)
    }

    fn off(&self, event: &str, id: Option<ListenerId>) {
        self.listeners.remove(event, id);
    }
}

/// A connected pair of in-process endpoints.
///
/// Must be created from within a Tokio runtime: each endpoint's delivery
/// queue is drained by a spawned task.
pub struct MemoryLink {
    state: Arc<LinkState>,
    client: Arc<MemoryEndpoint>,
    server: Arc<MemoryEndpoint>,
}

impl MemoryLink {
    /// Create a connected link and start both delivery tasks.
    #[must_use]
    pub fn new() -> Self {
        let state = Arc::new(LinkState::new_connected());

        let (client_queue, client_rx) = mpsc::unbounded_channel();
        let (server_queue, server_rx) = mpsc::unbounded_channel();
        let client_listeners = Arc::new(ListenerSet::new());
        let server_listeners = Arc::new(ListenerSet::new());

        tokio::spawn(pump("client", client_rx, client_listeners.clone()));
        tokio::spawn(pump("server", server_rx, server_listeners.clone()));

        let client = Arc::new(MemoryEndpoint {
            side: "client",
            state: state.clone(),
            listeners: client_listeners,
            peer_queue: server_queue,
            events_sent: AtomicU64::new(0),
        });
        let server = Arc::new(MemoryEndpoint {
            side: "server",
            state: state.clone(),
            listeners: server_listeners,
            peer_queue: client_queue,
            events_sent: AtomicU64::new(0),
        });

        debug!(session = ?state.session.read().as_deref(), "Memory link connected");

        Self {
            state,
            client,
            server,
        }
    }

    /// The client-side endpoint.
    #[must_use]
    pub fn client(&self) -> Arc<MemoryEndpoint> {
        self.client.clone()
    }

    /// The server-side endpoint.
    #[must_use]
    pub fn server(&self) -> Arc<MemoryEndpoint> {
        self.server.clone()
    }

    /// Whether the link is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Drop the connection and notify both endpoints.
    ///
    /// Returns false if the link was already disconnected.
    pub fn disconnect(&self) -> bool {
        if !self.state.connected.swap(false, Ordering::AcqRel) {
            return false;
        }
        *self.state.session.write() = None;

        self.notify_both(DISCONNECT_EVENT);
        debug!("Memory link disconnected");
        true
    }

    /// Restore the connection under a fresh session token.
    ///
    /// Returns false if the link was already connected.
    pub fn reconnect(&self) -> bool {
        if self.state.connected.load(Ordering::Acquire) {
            return false;
        }
        let session = new_session_token();
        *self.state.session.write() = Some(session.clone());
        self.state.connected.store(true, Ordering::Release);

        self.notify_both(CONNECT_EVENT);
        debug!(session = %session, "Memory link reconnected");
        true
    }

    fn notify_both(&self, event: &str) {
        for endpoint in [&self.client, &self.server] {
            let delivered = endpoint.listeners.dispatch(event, &Value::Null);
            trace!(side = endpoint.side, event = event, listeners = delivered, "Local event delivered");
        }
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain an endpoint queue into its listeners until every sender is dropped.
async fn pump(
    side: &'static str,
    mut queue: mpsc::UnboundedReceiver<Envelope>,
    listeners: Arc<ListenerSet>,
) {
    while let Some(envelope) = queue.recv().await {
        let delivered = listeners.dispatch(&envelope.event, &envelope.payload);
        trace!(
            side = side,
            event = %envelope.event,
            listeners = delivered,
            "Event delivered"
        );
    }
    trace!(side = side, "Delivery queue closed");
}
