//! Error types surfaced to callers.

use crate::domain::call_id::CallId;
use std::time::Duration;
use thiserror::Error;
use typsio_bus::TransportError;

/// Why a remote call failed.
///
/// Every variant reaches the caller through the call's future. The
/// correlation layer never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The transport was disconnected when the call was attempted.
    #[error("transport is not connected")]
    NotConnected,

    /// No reply arrived within the configured duration.
    #[error("rpc call '{method}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Remote method name
        method: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The remote side answered with an error; its message is kept verbatim.
    #[error("{0}")]
    Remote(String),

    /// The transport disconnected while the call was pending.
    #[error("transport disconnected, rpc call aborted")]
    ConnectionLost,

    /// The call was cancelled before it settled.
    #[error("rpc call cancelled")]
    Cancelled,

    /// The transport rejected the outbound message.
    #[error("transport error: {0}")]
    Transport(String),

    /// An id collided with one already in flight.
    #[error("duplicate call id: {0}")]
    DuplicateCallId(CallId),

    /// The reply could not be converted into the requested type.
    #[error("unexpected result for '{method}': {reason}")]
    Decode {
        /// Remote method name
        method: String,
        /// Deserialization failure
        reason: String,
    },
}

impl RpcError {
    /// Short, stable name of the error kind, for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RpcError::NotConnected => "not_connected",
            RpcError::Timeout { .. } => "timeout",
            RpcError::Remote(_) => "remote",
            RpcError::ConnectionLost => "connection_lost",
            RpcError::Cancelled => "cancelled",
            RpcError::Transport(_) => "transport",
            RpcError::DuplicateCallId(_) => "duplicate_call_id",
            RpcError::Decode { .. } => "decode",
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Disconnected => RpcError::NotConnected,
            other => RpcError::Transport(other.to_string()),
        }
    }
}
