//! # Event Streams
//!
//! A `Stream` view over every payload received for one event name.

use crate::transport::{ListenerId, Transport};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// Payloads of one event, in delivery order.
///
/// The underlying listener is removed from the transport when the stream is
/// dropped.
pub struct EventStream {
    event: String,
    listener: ListenerId,
    transport: Arc<dyn Transport>,
    inner: UnboundedReceiverStream<Value>,
}

impl EventStream {
    /// Subscribe to `event` on `transport`.
    pub fn subscribe(transport: Arc<dyn Transport>, event: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = transport.on(
            event,
            Arc::new(move |payload| {
                let _ = tx.send(payload);
            }),
        );
        debug!(event = event, "Event stream opened");

        Self {
            event: event.to_string(),
            listener,
            transport,
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// The event name this stream follows.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Stream for EventStream {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.transport.off(&self.event, Some(self.listener));
        debug!(event = %self.event, "Event stream closed");
    }
}
