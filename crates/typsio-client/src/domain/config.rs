//! Client configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;
use typsio_bus::{is_reserved_event, response_event_name, DEFAULT_RPC_EVENT};

/// Default time a call may stay pending.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long a call may wait for its reply
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Event carrying outbound calls; replies arrive on `<name>_response`
    pub rpc_event_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            rpc_event_name: DEFAULT_RPC_EVENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Replace the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the rpc event name.
    pub fn with_rpc_event_name(mut self, name: impl Into<String>) -> Self {
        self.rpc_event_name = name.into();
        self
    }

    /// Event name replies arrive on.
    pub fn response_event_name(&self) -> String {
        response_event_name(&self.rpc_event_name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("timeout cannot be 0".into()));
        }

        if self.rpc_event_name.trim().is_empty() {
            return Err(ConfigError::InvalidEventName(
                "rpc event name cannot be empty".into(),
            ));
        }

        if is_reserved_event(&self.rpc_event_name) {
            return Err(ConfigError::InvalidEventName(format!(
                "'{}' is reserved by the transport",
                self.rpc_event_name
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `TYPSIO_RPC_TIMEOUT`: call timeout, e.g. `10000`, `500ms`, `10s`, `2m` (default: 10000ms)
    /// - `TYPSIO_RPC_EVENT`: rpc event name (default: rpc_call)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("TYPSIO_RPC_TIMEOUT") {
            config.timeout =
                humantime_serde::parse_duration(&raw).map_err(|reason| ConfigError::Env {
                    var: "TYPSIO_RPC_TIMEOUT",
                    reason: reason.to_string(),
                })?;
        }

        if let Ok(name) = env::var("TYPSIO_RPC_EVENT") {
            config.rpc_event_name = name;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid rpc event name
    #[error("invalid event name: {0}")]
    InvalidEventName(String),
    /// Unparseable environment variable
    #[error("invalid environment variable {var}: {reason}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Parse failure
        reason: String,
    },
}

/// Human-readable durations: plain numbers are milliseconds, strings accept
/// `ms`, `s` and `m` suffixes.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Millis(ms) => Ok(Duration::from_millis(ms)),
            RawDuration::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Plain numbers are milliseconds
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration format")
        }
    }
}
