//! # Wire Protocol
//!
//! Payload shapes exchanged on the rpc event and its response event.
//!
//! ```text
//! rpc_call           { "call_id": "...", "function_name": "...", "args": [...] }
//! rpc_call_response  { "call_id": "...", "result": <any> }
//!                    { "call_id": "...", "error": "<message>" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RESPONSE_SUFFIX;

/// Name of the reply event paired with an rpc event.
pub fn response_event_name(rpc_event: &str) -> String {
    format!("{rpc_event}{RESPONSE_SUFFIX}")
}

/// An outbound call, built fresh for every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMessage {
    /// Correlates the call with its reply.
    pub call_id: String,
    /// Remote method name.
    pub function_name: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallMessage {
    /// Create a call message.
    pub fn new(call_id: impl Into<String>, function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            call_id: call_id.into(),
            function_name: function_name.into(),
            args,
        }
    }
}

/// A reply to a previously emitted call.
///
/// Exactly one of `result` / `error` is meaningful. A missing `error` means
/// success even when `result` is also missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// Id of the call being answered.
    pub call_id: String,
    /// Return value on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure reason, surfaced to the caller verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyMessage {
    /// Successful reply.
    pub fn success(call_id: impl Into<String>, result: Value) -> Self {
        Self {
            call_id: call_id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Failed reply.
    pub fn failure(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Collapse the reply into its outcome.
    ///
    /// An empty error string counts as no error. A success without a result
    /// yields `Value::Null`.
    pub fn into_outcome(self) -> Result<Value, String> {
        match self.error {
            Some(error) if !error.is_empty() => Err(error),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
