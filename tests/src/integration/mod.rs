//! Client ↔ server integration tests.

pub mod flows;
pub mod races;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typsio_bus::MemoryLink;
use typsio_client::{ClientConfig, TypsioClient};
use typsio_server::{HandlerError, MethodRegistry, RpcServer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
}

/// Methods shared by the integration scenarios.
///
/// - `get_user(id)`: `{id: 1, name: "a"}` for id 1, `null` otherwise
/// - `send_message(msg)`: `true`, or `"invalid payload"` for an empty text
/// - `sleep(ms)`: answers `ms` after sleeping that long
/// - `never()`: never answers
pub fn chat_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry
        .register_typed("get_user", |(user_id,): (u64,)| async move {
            Ok::<_, HandlerError>((user_id == 1).then(|| User {
                id: 1,
                name: "a".to_string(),
            }))
        })
        .expect("register get_user");
    registry
        .register_typed("send_message", |(message,): (Message,)| async move {
            if message.text.is_empty() {
                return Err(HandlerError::new("invalid payload"));
            }
            Ok(true)
        })
        .expect("register send_message");
    registry
        .register_typed("sleep", |(ms,): (u64,)| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, HandlerError>(ms)
        })
        .expect("register sleep");
    registry
        .register_fn("never", |_| std::future::pending())
        .expect("register never");
    registry
}

/// A connected client/server pair.
pub struct Harness {
    pub link: Arc<MemoryLink>,
    pub server: RpcServer,
    pub client: TypsioClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let link = Arc::new(MemoryLink::new());
        let server = RpcServer::serve(chat_registry(), link.server());
        let client = TypsioClient::with_config(
            link.client(),
            ClientConfig::default().with_timeout(timeout),
        )
        .expect("valid client config");
        Self {
            link,
            server,
            client,
        }
    }
}
