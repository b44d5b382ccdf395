//! Server configuration.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use typsio_bus::{is_reserved_event, response_event_name, DEFAULT_RPC_EVENT};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Event calls arrive on; replies go out on `<name>_response`
    pub rpc_event_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rpc_event_name: DEFAULT_RPC_EVENT.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_rpc_event_name(mut self, name: impl Into<String>) -> Self {
        self.rpc_event_name = name.into();
        self
    }

    pub fn response_event_name(&self) -> String {
        response_event_name(&self.rpc_event_name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
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

    /// Build configuration from environment variables.
    ///
    /// - `TYPSIO_RPC_EVENT`: rpc event name (default: rpc_call)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
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
    #[error("invalid event name: {0}")]
    InvalidEventName(String),
}
