//! Typsio client - main entry point of the correlation layer.
//!
//! Wires the dispatcher and reply router to a transport and exposes the
//! caller-facing API: generic invocation plus passthrough event subscription.

use crate::domain::{
    CallId, ClientConfig, ConfigError, PendingCallRegistry, RpcError, StatsSnapshot,
};
use crate::ipc::{CallDispatcher, PendingReply, ReplyRouter};
use crate::ports::{ListenerId, RemoteInvoker, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use typsio_bus::{EventStream, DISCONNECT_EVENT};

/// Client for correlated remote calls over a [`Transport`].
///
/// On construction it subscribes the reply router to the response event and
/// to the transport's `disconnect` notification. Dropping the client removes
/// those listeners and rejects every call still pending with
/// [`RpcError::ConnectionLost`].
pub struct TypsioClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<PendingCallRegistry>,
    dispatcher: CallDispatcher,
    /// Router listeners installed on the transport
    router_listeners: Vec<(String, ListenerId)>,
}

impl TypsioClient {
    /// Create a client with the default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let config = ClientConfig::default();
        Self::build(transport, config)
    }

    /// Create a client with a custom configuration.
    pub fn with_config(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let registry = Arc::new(PendingCallRegistry::new());
        let dispatcher = CallDispatcher::new(transport.clone(), registry.clone(), &config);
        let router = Arc::new(ReplyRouter::new(registry.clone()));

        let response_event = config.response_event_name();
        let on_reply = {
            let router = router.clone();
            transport.on(
                &response_event,
                Arc::new(move |payload| {
                    router.on_reply(payload);
                }),
            )
        };
        let on_disconnect = transport.on(
            DISCONNECT_EVENT,
            Arc::new(move |_| {
                router.on_disconnect();
            }),
        );

        info!(
            rpc_event = %config.rpc_event_name,
            timeout_ms = config.timeout.as_millis(),
            "Typsio client ready"
        );

        Self {
            config,
            transport,
            registry,
            dispatcher,
            router_listeners: vec![
                (response_event, on_reply),
                (DISCONNECT_EVENT.to_string(), on_disconnect),
            ],
        }
    }

    /// Start a call and return its handle without waiting.
    ///
    /// Admission happens synchronously: a disconnected transport yields
    /// [`RpcError::NotConnected`] with nothing sent or registered.
    pub fn dispatch(&self, method: &str, args: Vec<Value>) -> Result<PendingReply, RpcError> {
        self.dispatcher.dispatch(method, args, None)
    }

    /// Like [`dispatch`](Self::dispatch) with a timeout for this call only.
    pub fn dispatch_with_timeout(
        &self,
        method: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<PendingReply, RpcError> {
        self.dispatcher.dispatch(method, args, Some(timeout))
    }

    /// Call `method` and wait for its reply.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.dispatch(method, args)?.await
    }

    /// Reject a pending call with [`RpcError::Cancelled`].
    ///
    /// Returns false if the call had already settled.
    pub fn cancel(&self, call_id: &CallId) -> bool {
        self.registry.cancel(call_id.as_str())
    }

    /// Listen for a server-pushed event.
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.transport.on(event, Arc::new(listener))
    }

    /// Remove one listener, or all listeners of `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<ListenerId>) {
        self.transport.off(event, id);
    }

    /// Stream of payloads for a server-pushed event.
    pub fn subscribe(&self, event: &str) -> EventStream {
        EventStream::subscribe(self.transport.clone(), event)
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Number of calls currently awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }

    /// Lifecycle counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats().snapshot()
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteInvoker for TypsioClient {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        TypsioClient::invoke(self, method, args).await
    }
}

impl Drop for TypsioClient {
    fn drop(&mut self) {
        for (event, id) in self.router_listeners.drain(..) {
            self.transport.off(&event, Some(id));
        }
        let rejected = self.registry.sweep();
        debug!(rejected = rejected, "Typsio client closed");
    }
}
