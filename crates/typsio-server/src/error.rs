//! Server error types.

use thiserror::Error;

/// Failure of a method handler.
///
/// The message travels to the caller verbatim as the reply's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Reply for a method name with no registered handler.
    pub fn not_found(method: &str) -> Self {
        Self::new(format!("method '{method}' not found"))
    }

    /// Reply for arguments that do not match a typed handler's signature.
    pub fn invalid_arguments(method: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(format!("invalid arguments for '{method}': {reason}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_message(self) -> String {
        self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Method registration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler is already registered under this name
    #[error("method '{0}' is already registered")]
    Duplicate(String),
    /// Empty method name
    #[error("method name cannot be empty")]
    EmptyName,
}
