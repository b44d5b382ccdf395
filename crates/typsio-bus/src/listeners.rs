//! # Listener Set
//!
//! Per-event listener bookkeeping shared by transport implementations.

use crate::transport::{Listener, ListenerId};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Listeners registered per event name, in registration order.
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl ListenerSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its handle.
    pub fn add(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        trace!(event = event, listener = %id, "Listener registered");
        id
    }

    /// Remove one listener, or all listeners of `event` when `id` is `None`.
    ///
    /// Returns how many listeners were removed.
    pub fn remove(&self, event: &str, id: Option<ListenerId>) -> usize {
        let mut listeners = self.listeners.write();
        let Some(entries) = listeners.get_mut(event) else {
            return 0;
        };

        let before = entries.len();
        match id {
            Some(id) => entries.retain(|(existing, _)| *existing != id),
            None => entries.clear(),
        }
        let removed = before - entries.len();

        if entries.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Invoke every listener of `event` with a clone of `payload`.
    ///
    /// Listeners run after the internal lock is released, so they may add or
    /// remove listeners themselves. Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let targets: Vec<Listener> = match self.listeners.read().get(event) {
            Some(entries) => entries.iter().map(|(_, l)| l.clone()).collect(),
            None => return 0,
        };

        for listener in &targets {
            listener(payload.clone());
        }
        targets.len()
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}
