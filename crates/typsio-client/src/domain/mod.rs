//! Domain types for the correlation layer.
//!
//! Call identifiers, the pending call registry, configuration and errors.
//! Nothing in here touches the transport.

pub mod call_id;
pub mod config;
pub mod error;
pub mod pending;

// Re-exports for convenience
pub use call_id::{CallId, CallIdAllocator};
pub use config::{ClientConfig, ConfigError, DEFAULT_TIMEOUT};
pub use error::RpcError;
pub use pending::{CallStats, Outcome, PendingCallRegistry, StatsSnapshot};
