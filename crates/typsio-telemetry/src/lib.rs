//! # Typsio Telemetry
//!
//! Structured logging for Typsio services, built on `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use typsio_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs from typsio-client / typsio-server are now emitted
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `typsio` | Service name in logs |
//! | `TYPSIO_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `TYPSIO_JSON_LOGS` | `false` | JSON formatted output |
//! | `TYPSIO_CONSOLE_OUTPUT` | `true` | Write logs to the console |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Initialize logging.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
