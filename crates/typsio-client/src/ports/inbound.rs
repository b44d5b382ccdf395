//! # Inbound Port - RemoteInvoker
//!
//! The single generic entry point every remote method goes through. Typed
//! per-method wrappers are produced by an external code generator as thin
//! call-throughs to this trait; the correlation core never branches on the
//! method name.
//!
//! # Example
//!
//! ```rust,ignore
//! use typsio_client::{RemoteInvoker, RpcError};
//!
//! struct Api<'a, R: RemoteInvoker>(&'a R);
//!
//! impl<R: RemoteInvoker> Api<'_, R> {
//!     async fn get_user(&self, user_id: u64) -> Result<Option<User>, RpcError> {
//!         self.0.invoke_as("get_user", vec![user_id.into()]).await
//!     }
//! }
//! ```

use crate::domain::RpcError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Invoke remote methods by name.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Call `method` with positional `args` and wait for its correlated reply.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError>;

    /// Call `method` and deserialize the result into `T`.
    async fn invoke_as<T>(&self, method: &str, args: Vec<Value>) -> Result<T, RpcError>
    where
        T: DeserializeOwned + Send,
    {
        let value = self.invoke(method, args).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}
