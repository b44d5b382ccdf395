//! Outbound ports for the correlation layer.
//!
//! The client drives any [`Transport`]: it emits calls on the rpc event and
//! installs listeners for the response event and the local `disconnect`
//! notification.

pub use typsio_bus::{Listener, ListenerId, Transport, TransportError};
