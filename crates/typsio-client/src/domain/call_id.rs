//! Call identifiers and their allocation.
//!
//! An id is `"{session}-{counter}"`. The session part is the transport's
//! connection token (it changes on reconnect); the counter belongs to one
//! client instance and is never reset. Either part alone keeps ids unique
//! across a reconnect, so a reply from a previous connection can never be
//! matched to a new call.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Opaque token correlating one outbound call with at most one reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CallId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Issues call ids for one client instance.
pub struct CallIdAllocator {
    /// Used as the session part when the transport exposes no session token.
    instance_token: String,
    counter: AtomicU64,
}

impl CallIdAllocator {
    /// Create an allocator with a random instance token.
    pub fn new() -> Self {
        Self {
            instance_token: Uuid::now_v7().simple().to_string(),
            counter: AtomicU64::new(0),
        }
    }

    /// Allocate the next id under the given session token.
    pub fn next(&self, session: Option<&str>) -> CallId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let session = session.unwrap_or(&self.instance_token);
        CallId(format!("{session}-{n}"))
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for CallIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
