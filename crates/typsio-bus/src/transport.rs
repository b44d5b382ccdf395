//! # Transport Port
//!
//! The interface the RPC layer needs from a bidirectional message channel.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Callback invoked with the payload of a received event.
pub type Listener = Arc<dyn Fn(Value) + Send + Sync>;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport is not connected.
    #[error("transport disconnected")]
    Disconnected,

    /// The underlying channel has shut down.
    #[error("transport closed")]
    Closed,

    /// The payload could not be sent.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A named-event, bidirectional message transport.
///
/// Emission never blocks: it hands the payload to the transport and returns.
/// Received events, including the local `connect` / `disconnect`
/// notifications, are delivered to listeners registered with [`Transport::on`].
pub trait Transport: Send + Sync {
    /// Whether the transport currently reports itself connected.
    fn is_connected(&self) -> bool;

    /// Token identifying the current connection, if the transport has one.
    ///
    /// Expected to change whenever the transport reconnects.
    fn session_id(&self) -> Option<String>;

    /// Send a named event to the peer.
    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    /// Register a listener for a named event.
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// Remove one listener, or every listener of the event when `id` is `None`.
    fn off(&self, event: &str, id: Option<ListenerId>);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn session_id(&self) -> Option<String> {
        (**self).session_id()
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        (**self).emit(event, payload)
    }

    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        (**self).on(event, listener)
    }

    fn off(&self, event: &str, id: Option<ListenerId>) {
        (**self).off(event, id)
    }
}
