//! # Typsio Server - Method Registry and Call Server
//!
//! The answering side of the correlation protocol: a [`MethodRegistry`] of
//! named handlers served over a [`Transport`](typsio_bus::Transport) by
//! [`RpcServer`], which also pushes named events to the peer.
//!
//! ```ignore
//! use typsio_server::{HandlerError, MethodRegistry, RpcServer};
//!
//! let mut registry = MethodRegistry::new();
//! registry.register_typed("get_user", |(id,): (u64,)| async move {
//!     Ok::<_, HandlerError>(users.get(id))
//! })?;
//!
//! let server = RpcServer::serve(registry, link.server());
//! server.push("newNotification", json!({"message": "hello"}))?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::{HandlerError, RegistryError};
pub use registry::{MethodDescriptor, MethodEntry, MethodRegistry, ParamSpec, RpcHandler};
pub use server::{RpcServer, ServerStats, ServerStatsSnapshot};
