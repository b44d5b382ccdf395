//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter directive (`info`, `typsio_client=debug,warn`, ...)
    pub log_level: String,

    /// Whether to write logs to the console at all
    pub console_output: bool,

    /// JSON formatted logs instead of human-readable ones
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "typsio".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: typsio)
    /// - `TYPSIO_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `TYPSIO_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `TYPSIO_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "typsio".to_string()),

            log_level: env::var("TYPSIO_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("TYPSIO_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v).unwrap_or(true))
                .unwrap_or(true),

            json_logs: env::var("TYPSIO_JSON_LOGS")
                .map(|v| parse_flag(&v).unwrap_or(false))
                .unwrap_or(is_container),
        }
    }

    /// Configuration for a named service, otherwise from the environment.
    pub fn for_service(name: &str) -> Self {
        Self {
            service_name: name.to_string(),
            ..Self::from_env()
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
