//! Reply router: transport-driven entry points that settle pending calls.

use crate::domain::PendingCallRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use typsio_bus::ReplyMessage;

/// Routes replies and disconnect notifications to the pending registry.
pub struct ReplyRouter {
    registry: Arc<PendingCallRegistry>,
}

impl ReplyRouter {
    pub fn new(registry: Arc<PendingCallRegistry>) -> Self {
        Self { registry }
    }

    /// Handle a payload received on the response event.
    ///
    /// Returns true if it settled a pending call. Replies for unknown or
    /// already settled ids are dropped quietly; undecodable payloads are
    /// dropped with a warning.
    pub fn on_reply(&self, payload: Value) -> bool {
        let mut reply = match serde_json::from_value::<ReplyMessage>(payload) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Dropping malformed reply");
                return false;
            }
        };

        let call_id = std::mem::take(&mut reply.call_id);
        self.registry.resolve(&call_id, reply.into_outcome())
    }

    /// Handle a transport disconnect: reject every pending call.
    ///
    /// Returns how many calls were rejected.
    pub fn on_disconnect(&self) -> usize {
        let swept = self.registry.sweep();
        if swept > 0 {
            info!(rejected = swept, "Transport disconnected, rejected pending calls");
        }
        swept
    }
}
