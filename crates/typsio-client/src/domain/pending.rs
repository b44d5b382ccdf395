//! Pending Call Registry - maps call ids to the callers awaiting a reply.
//!
//! Every terminal path (reply, timeout, disconnect, cancel, abandon) starts
//! with an atomic `remove`. Only the path that obtains the entry settles it,
//! so a call is settled at most once no matter how the paths interleave, and
//! removing an id that is already gone is a silent no-op.

use crate::domain::call_id::CallId;
use crate::domain::error::RpcError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

/// Final result delivered to a caller.
pub type Outcome = Result<Value, RpcError>;

/// One in-flight call.
struct PendingCall {
    /// Completion handle; consumed by the single settling path
    sender: oneshot::Sender<Outcome>,
    /// Timeout task, owned by this entry
    timer: Option<AbortHandle>,
    /// Method name (for logging and timeout errors)
    method: String,
    /// Timeout armed for this call
    timeout: Duration,
    created_at: Instant,
}

impl PendingCall {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Deliver the outcome. Returns false if the caller is no longer listening.
    fn settle(mut self, outcome: Outcome) -> bool {
        self.cancel_timer();
        self.sender.send(outcome).is_ok()
    }
}

/// Lifecycle counters for the registry.
#[derive(Debug, Default)]
pub struct CallStats {
    /// Calls accepted and emitted
    pub dispatched: AtomicU64,
    /// Calls resolved with a value
    pub resolved: AtomicU64,
    /// Calls rejected by the remote side
    pub remote_errors: AtomicU64,
    /// Calls that timed out
    pub timeouts: AtomicU64,
    /// Calls swept by a disconnect
    pub connection_lost: AtomicU64,
    /// Calls cancelled explicitly
    pub cancelled: AtomicU64,
    /// Calls whose caller dropped the future first
    pub abandoned: AtomicU64,
    /// Replies for ids that were no longer pending
    pub stale_replies: AtomicU64,
}

impl CallStats {
    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            connection_lost: self.connection_lost.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            stale_replies: self.stale_replies.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`CallStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub dispatched: u64,
    pub resolved: u64,
    pub remote_errors: u64,
    pub timeouts: u64,
    pub connection_lost: u64,
    pub cancelled: u64,
    pub abandoned: u64,
    pub stale_replies: u64,
}

impl StatsSnapshot {
    /// Calls that reached a terminal state.
    pub fn settled(&self) -> u64 {
        self.resolved
            + self.remote_errors
            + self.timeouts
            + self.connection_lost
            + self.cancelled
            + self.abandoned
    }
}

/// Registry of in-flight calls.
///
/// Flow:
/// 1. Dispatcher allocates a `CallId` and calls `insert()` to get a receiver
/// 2. Dispatcher arms the timeout and hands it over with `attach_timer()`
/// 3. Dispatcher emits the call on the transport
/// 4. Exactly one of `resolve()`, `expire()`, `sweep()`, `cancel()` or
///    `abandon()` removes the entry and settles it
pub struct PendingCallRegistry {
    pending: DashMap<CallId, PendingCall>,
    stats: CallStats,
}

impl PendingCallRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: CallStats::default(),
        }
    }

    /// Track a new call and return the receiving half of its completion.
    ///
    /// Never overwrites: an id already present is reported as
    /// [`RpcError::DuplicateCallId`].
    pub fn insert(
        &self,
        call_id: CallId,
        method: &str,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<Outcome>, RpcError> {
        match self.pending.entry(call_id) {
            Entry::Occupied(occupied) => Err(RpcError::DuplicateCallId(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel();
                trace!(call_id = %vacant.key(), method = method, "Registered pending call");
                vacant.insert(PendingCall {
                    sender: tx,
                    timer: None,
                    method: method.to_string(),
                    timeout,
                    created_at: Instant::now(),
                });
                Ok(rx)
            }
        }
    }

    /// Hand the timeout task to its entry.
    ///
    /// If the entry is already gone the timer is aborted right away.
    pub fn attach_timer(&self, call_id: &CallId, timer: AbortHandle) {
        match self.pending.get_mut(call_id) {
            Some(mut entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }
    }

    fn take(&self, call_id: &str) -> Option<PendingCall> {
        self.pending.remove(call_id).map(|(_, call)| call)
    }

    /// Settle a call from its reply.
    ///
    /// Returns false when the id is unknown or already settled, which is an
    /// expected race with the timeout and disconnect paths.
    pub fn resolve(&self, call_id: &str, outcome: Result<Value, String>) -> bool {
        let Some(call) = self.take(call_id) else {
            self.stats.stale_replies.fetch_add(1, Ordering::Relaxed);
            debug!(call_id = call_id, "Reply for unknown or already settled call");
            return false;
        };

        let response_time = call.created_at.elapsed();
        let method = call.method.clone();
        let is_success = outcome.is_ok();

        let delivered = call.settle(outcome.map_err(RpcError::Remote));
        if is_success {
            self.stats.resolved.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.remote_errors.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            call_id = call_id,
            method = %method,
            success = is_success,
            delivered = delivered,
            response_time_ms = response_time.as_millis(),
            "Settled pending call"
        );
        true
    }

    /// Reject a call whose timeout fired.
    pub fn expire(&self, call_id: &str) -> bool {
        let Some(mut call) = self.take(call_id) else {
            return false;
        };

        // Invoked from the timer task itself; nothing to abort.
        call.timer = None;
        let error = RpcError::Timeout {
            method: call.method.clone(),
            timeout: call.timeout,
        };

        warn!(
            call_id = call_id,
            method = %call.method,
            timeout_ms = call.timeout.as_millis(),
            "Pending call timed out"
        );

        self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
        call.settle(Err(error));
        true
    }

    /// Reject a call on explicit request.
    pub fn cancel(&self, call_id: &str) -> bool {
        let Some(call) = self.take(call_id) else {
            return false;
        };

        debug!(call_id = call_id, method = %call.method, "Cancelled pending call");
        self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
        call.settle(Err(RpcError::Cancelled));
        true
    }

    /// Forget a call whose caller stopped waiting.
    pub fn abandon(&self, call_id: &str) -> bool {
        let Some(mut call) = self.take(call_id) else {
            return false;
        };

        call.cancel_timer();
        trace!(call_id = call_id, method = %call.method, "Abandoned pending call");
        self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Undo an insertion whose message never left (not counted as settled).
    pub fn discard(&self, call_id: &str) -> bool {
        match self.take(call_id) {
            Some(mut call) => {
                call.cancel_timer();
                true
            }
            None => false,
        }
    }

    /// Reject every call pending at the start of the sweep with
    /// [`RpcError::ConnectionLost`].
    ///
    /// Calls inserted while the sweep runs are left alone. Returns how many
    /// calls this sweep settled.
    pub fn sweep(&self) -> usize {
        let ids: Vec<CallId> = self.pending.iter().map(|entry| entry.key().clone()).collect();

        let mut swept = 0;
        for id in ids {
            // Another path may have won the race for this id
            if let Some(call) = self.take(id.as_str()) {
                call.settle(Err(RpcError::ConnectionLost));
                swept += 1;
            }
        }

        self.stats
            .connection_lost
            .fetch_add(swept as u64, Ordering::Relaxed);
        swept
    }

    /// Record a successfully emitted call.
    pub fn record_dispatch(&self) {
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of calls currently pending
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a call id is pending
    pub fn is_pending(&self, call_id: &str) -> bool {
        self.pending.contains_key(call_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &CallStats {
        &self.stats
    }
}

impl Default for PendingCallRegistry {
    fn default() -> Self {
        Self::new()
    }
}
