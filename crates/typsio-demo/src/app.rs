//! Demo chat application: server-side methods and the client-side typed API.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use typsio_client::{RemoteInvoker, RpcError};
use typsio_server::{HandlerError, MethodRegistry, RegistryError};

/// Event the server pushes to clients.
pub const NOTIFICATION_EVENT: &str = "newNotification";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
}

const MAX_MESSAGE_LEN: usize = 256;

/// Server-side method table.
pub fn registry() -> Result<MethodRegistry, RegistryError> {
    let mut registry = MethodRegistry::new();

    registry
        .register_typed("get_user", |(user_id,): (u64,)| async move {
            Ok::<_, HandlerError>((user_id == 1).then(|| User {
                id: 1,
                name: "Alice".to_string(),
            }))
        })?
        .param("user_id", "int")
        .returns("User | None");

    registry
        .register_typed("send_message", |(message,): (Message,)| async move {
            if message.text.is_empty() || message.text.len() > MAX_MESSAGE_LEN {
                return Err(HandlerError::new("invalid payload"));
            }
            tracing::info!(from = %message.user.name, text = %message.text, "Message received");
            Ok(true)
        })?
        .param("message", "Message")
        .returns("bool");

    registry
        .register_typed("slow_echo", |(value, ms): (serde_json::Value, u64)| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, HandlerError>(json!({ "echo": value }))
        })?
        .param("value", "Any")
        .param("delay_ms", "int")
        .describe("Echo a value after a delay");

    Ok(registry)
}

/// Typed call-throughs, the shape of generated client wrappers.
pub struct ChatApi<'a, R: RemoteInvoker> {
    invoker: &'a R,
}

impl<'a, R: RemoteInvoker> ChatApi<'a, R> {
    pub fn new(invoker: &'a R) -> Self {
        Self { invoker }
    }

    pub async fn get_user(&self, user_id: u64) -> Result<Option<User>, RpcError> {
        self.invoker.invoke_as("get_user", vec![json!(user_id)]).await
    }

    pub async fn send_message(&self, message: &Message) -> Result<bool, RpcError> {
        self.invoker
            .invoke_as("send_message", vec![json!(message)])
            .await
    }
}
