//! Ports for the correlation layer.
//!
//! - `inbound`: the generic invocation API typed wrappers are built on
//! - `outbound`: the transport the layer drives

pub mod inbound;
pub mod outbound;

pub use inbound::RemoteInvoker;
pub use outbound::{Listener, ListenerId, Transport, TransportError};
