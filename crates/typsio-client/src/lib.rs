//! # Typsio Client - Call Correlation Layer
//!
//! Turns a fire-and-forget, named-event transport into awaitable remote calls.
//! Every call carries a unique id; the matching reply, a timeout, a cancel or a
//! transport disconnect settles it exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         TypsioClient                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   invoke / dispatch                    on / off / subscribe      │
//! │         │                                     │                  │
//! │  ┌──────┴─────────┐                           │                  │
//! │  │ CallDispatcher │  admission → id → insert → timer → emit      │
//! │  └──────┬─────────┘                           │                  │
//! │         │                                     │                  │
//! │  ┌──────┴──────────────────────┐              │                  │
//! │  │    PendingCallRegistry      │ ←─ ReplyRouter (reply, sweep)   │
//! │  │ (DashMap<CallId, oneshot>)  │              │                  │
//! │  └─────────────────────────────┘              │                  │
//! └─────────┼─────────────────────────────────────┼──────────────────┘
//!           │                                     │
//!      Transport ("rpc_call" / "rpc_call_response" / "disconnect")
//! ```
//!
//! ## Settlement
//!
//! Every terminal path (reply, timeout, disconnect sweep, cancel, drop of the
//! [`PendingReply`]) starts by removing the entry from the registry. Only the
//! path that obtained the entry settles the caller, so a call resolves or
//! rejects at most once and late replies are ignored.
//!
//! ## Usage
//!
//! ```ignore
//! use typsio_client::{RemoteInvoker, TypsioClient};
//!
//! let client = TypsioClient::new(link.client());
//! let user = client.invoke("get_user", vec![1.into()]).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use domain::{
    CallId, CallIdAllocator, CallStats, ClientConfig, ConfigError, PendingCallRegistry, RpcError,
    StatsSnapshot, DEFAULT_TIMEOUT,
};
pub use ipc::{CallDispatcher, PendingReply, ReplyRouter};
pub use ports::{Listener, ListenerId, RemoteInvoker, Transport, TransportError};
pub use service::TypsioClient;

pub use typsio_bus::EventStream;
