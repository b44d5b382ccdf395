//! Call dispatcher: admission, id allocation, timeout arming and emission.

use crate::domain::{
    CallId, CallIdAllocator, ClientConfig, Outcome, PendingCallRegistry, RpcError,
};
use crate::ports::Transport;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use typsio_bus::CallMessage;

/// Emits calls and registers them for correlation.
pub struct CallDispatcher {
    transport: Arc<dyn Transport>,
    registry: Arc<PendingCallRegistry>,
    ids: CallIdAllocator,
    rpc_event: String,
    default_timeout: Duration,
}

impl CallDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<PendingCallRegistry>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            ids: CallIdAllocator::new(),
            rpc_event: config.rpc_event_name.clone(),
            default_timeout: config.timeout,
        }
    }

    /// Admit and emit a call.
    ///
    /// Fails with [`RpcError::NotConnected`] without any side effect when the
    /// transport is down. Must run inside a Tokio runtime (the timeout is a
    /// spawned task).
    pub fn dispatch(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
    ) -> Result<PendingReply, RpcError> {
        if !self.transport.is_connected() {
            debug!(method = method, "Rejected call, transport not connected");
            return Err(RpcError::NotConnected);
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        let call_id = self.ids.next(self.transport.session_id().as_deref());
        let receiver = self.registry.insert(call_id.clone(), method, timeout)?;
        self.arm_timeout(&call_id, timeout);

        let message = CallMessage::new(call_id.as_str(), method, args);
        let emitted = serde_json::to_value(&message)
            .map_err(|e| RpcError::Transport(format!("encode failed: {e}")))
            .and_then(|payload| {
                self.transport
                    .emit(&self.rpc_event, payload)
                    .map_err(RpcError::from)
            });

        if let Err(e) = emitted {
            self.registry.discard(call_id.as_str());
            warn!(call_id = %call_id, method = method, error = %e, "Failed to emit call");
            return Err(e);
        }

        self.registry.record_dispatch();
        debug!(
            call_id = %call_id,
            method = method,
            timeout_ms = timeout.as_millis(),
            "Dispatched call"
        );

        Ok(PendingReply {
            call_id,
            receiver,
            registry: self.registry.clone(),
            settled: false,
        })
    }

    fn arm_timeout(&self, call_id: &CallId, timeout: Duration) {
        let registry = self.registry.clone();
        let expired = call_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.expire(expired.as_str());
        });
        self.registry.attach_timer(call_id, timer.abort_handle());
    }

    /// Number of call ids issued so far.
    pub fn issued(&self) -> u64 {
        self.ids.issued()
    }
}

/// The caller's handle on an in-flight call.
///
/// Resolves exactly once with the reply value or the error that settled the
/// call. Dropping it before it settles withdraws the call: the registry entry
/// is removed and its timer cancelled; a late reply is then ignored.
#[must_use = "a pending reply is withdrawn when dropped"]
pub struct PendingReply {
    call_id: CallId,
    receiver: oneshot::Receiver<Outcome>,
    registry: Arc<PendingCallRegistry>,
    settled: bool,
}

impl PendingReply {
    /// Identifier of this call.
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }
}

impl Future for PendingReply {
    type Output = Result<Value, RpcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(outcome)) => outcome,
            // The sender only disappears without a value if its entry was
            // torn down without settling.
            Poll::Ready(Err(_)) => Err(RpcError::ConnectionLost),
        };
        self.settled = true;
        Poll::Ready(outcome)
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.abandon(self.call_id.as_str());
        }
    }
}
