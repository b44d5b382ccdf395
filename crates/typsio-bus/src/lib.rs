//! # Typsio Bus - Named-Event Transport
//!
//! The transport port that the RPC client and server are built on, the wire
//! payloads that travel over it, and an in-memory implementation.
//!
//! ## Event Flow
//!
//! ```text
//! ┌──────────────┐        emit("rpc_call")          ┌──────────────┐
//! │    Client    │ ───────────────────────────────→ │    Server    │
//! │  (endpoint A)│                                  │ (endpoint B) │
//! │              │ ←─────────────────────────────── │              │
//! └──────────────┘   emit("rpc_call_response")      └──────────────┘
//!        ↑                                                 ↑
//!        └──── local "connect" / "disconnect" events ──────┘
//! ```
//!
//! ## Contents
//!
//! - [`Transport`]: emit named payloads, subscribe listeners, report connection state
//! - [`protocol`]: `CallMessage` / `ReplyMessage` payload shapes
//! - [`MemoryLink`]: a connected pair of in-process endpoints with ordered delivery
//! - [`EventStream`]: a `Stream` view over one event name

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod listeners;
pub mod memory;
pub mod protocol;
pub mod subscriber;
pub mod transport;

// Re-export main types
pub use listeners::ListenerSet;
pub use memory::{MemoryEndpoint, MemoryLink};
pub use protocol::{response_event_name, CallMessage, ReplyMessage};
pub use subscriber::EventStream;
pub use transport::{Listener, ListenerId, Transport, TransportError};

/// Default event name carrying outbound calls.
pub const DEFAULT_RPC_EVENT: &str = "rpc_call";

/// Suffix appended to the rpc event name for replies.
pub const RESPONSE_SUFFIX: &str = "_response";

/// Local event raised by a transport when it (re)connects.
pub const CONNECT_EVENT: &str = "connect";

/// Local event raised by a transport when it loses its connection.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Returns true for event names a transport raises on its own.
///
/// These cannot be used as rpc event names.
pub fn is_reserved_event(name: &str) -> bool {
    name == CONNECT_EVENT || name == DISCONNECT_EVENT
}
