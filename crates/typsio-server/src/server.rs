//! # RPC Server
//!
//! Serves a [`MethodRegistry`] over a transport:
//!
//! ```text
//! "rpc_call" {call_id, function_name, args}
//!        │
//!        ▼
//!  decode ──(malformed)──→ warn, drop
//!        │
//!        ▼
//!  tokio::spawn(handler)          calls complete out of order
//!        │
//!        ▼
//! "rpc_call_response" {call_id, result} | {call_id, error}
//! ```
//!
//! The transport listener only holds a weak reference to the transport, so a
//! transport never keeps itself alive through its own listeners.

use crate::config::{ConfigError, ServerConfig};
use crate::registry::{MethodDescriptor, MethodRegistry};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use typsio_bus::{CallMessage, ListenerId, ReplyMessage, Transport, TransportError};

/// Server counters
#[derive(Debug, Default)]
pub struct ServerStats {
    received: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    malformed: AtomicU64,
    reply_failures: AtomicU64,
}

impl ServerStats {
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            reply_failures: self.reply_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServerStatsSnapshot {
    /// Well-formed call messages received
    pub received: u64,
    /// Calls answered with a result
    pub succeeded: u64,
    /// Calls answered with an error (unknown method, bad arguments, handler failure)
    pub failed: u64,
    /// Undecodable call messages dropped
    pub malformed: u64,
    /// Replies that could not be emitted
    pub reply_failures: u64,
}

/// Serves registered methods on a transport until dropped.
pub struct RpcServer {
    config: ServerConfig,
    registry: Arc<MethodRegistry>,
    transport: Arc<dyn Transport>,
    stats: Arc<ServerStats>,
    subscription: ListenerId,
}

impl RpcServer {
    /// Serve `registry` on `transport` with the default configuration.
    ///
    /// Must be called inside a Tokio runtime; handlers run on it.
    pub fn serve(registry: MethodRegistry, transport: Arc<dyn Transport>) -> Self {
        Self::start(registry, transport, ServerConfig::default())
    }

    /// Serve with a custom configuration.
    pub fn serve_with_config(
        registry: MethodRegistry,
        transport: Arc<dyn Transport>,
        config: ServerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::start(registry, transport, config))
    }

    fn start(registry: MethodRegistry, transport: Arc<dyn Transport>, config: ServerConfig) -> Self {
        let registry = Arc::new(registry);
        let stats = Arc::new(ServerStats::default());

        let context = Arc::new(CallContext {
            registry: registry.clone(),
            transport: Arc::downgrade(&transport),
            response_event: config.response_event_name(),
            stats: stats.clone(),
        });
        let runtime = Handle::current();

        let subscription = transport.on(
            &config.rpc_event_name,
            Arc::new(move |payload| {
                let call = match serde_json::from_value::<CallMessage>(payload) {
                    Ok(call) => call,
                    Err(e) => {
                        context.stats.malformed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Dropping malformed call message");
                        return;
                    }
                };
                context.stats.received.fetch_add(1, Ordering::Relaxed);
                runtime.spawn(context.clone().handle(call));
            }),
        );

        info!(
            rpc_event = %config.rpc_event_name,
            methods = registry.len(),
            "RPC server serving"
        );

        Self {
            config,
            registry,
            transport,
            stats,
            subscription,
        }
    }

    /// Emit a server-pushed event to the peer.
    pub fn push(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        self.transport.emit(event, payload)?;
        debug!(event = event, "Pushed event");
        Ok(())
    }

    /// Descriptors of the served methods.
    pub fn catalogue(&self) -> Vec<MethodDescriptor> {
        self.registry.catalogue()
    }

    pub fn stats(&self) -> ServerStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.transport
            .off(&self.config.rpc_event_name, Some(self.subscription));
        debug!(rpc_event = %self.config.rpc_event_name, "RPC server stopped");
    }
}

/// State shared by every spawned call.
struct CallContext {
    registry: Arc<MethodRegistry>,
    transport: Weak<dyn Transport>,
    response_event: String,
    stats: Arc<ServerStats>,
}

impl CallContext {
    async fn handle(self: Arc<Self>, call: CallMessage) {
        let started = Instant::now();
        let CallMessage {
            call_id,
            function_name,
            args,
        } = call;

        let reply = match self.registry.call(&function_name, args).await {
            Ok(result) => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                ReplyMessage::success(call_id.clone(), result)
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                debug!(call_id = %call_id, method = %function_name, error = %e, "Call failed");
                // An empty error field reads as success on the wire
                let message = match e.into_message() {
                    m if m.is_empty() => format!("method '{function_name}' failed"),
                    m => m,
                };
                ReplyMessage::failure(call_id.clone(), message)
            }
        };

        if let Err(e) = self.send(reply) {
            self.stats.reply_failures.fetch_add(1, Ordering::Relaxed);
            warn!(call_id = %call_id, method = %function_name, error = %e, "Failed to send reply");
            return;
        }

        debug!(
            call_id = %call_id,
            method = %function_name,
            response_time_ms = started.elapsed().as_millis(),
            "Call answered"
        );
    }

    fn send(&self, reply: ReplyMessage) -> Result<(), TransportError> {
        let transport = self.transport.upgrade().ok_or(TransportError::Closed)?;
        let payload = serde_json::to_value(&reply)
            .map_err(|e| TransportError::SendFailed(format!("encode failed: {e}")))?;
        transport.emit(&self.response_event, payload)
    }
}
