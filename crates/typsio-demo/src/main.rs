//! # Typsio Demo
//!
//! Runs a client and a server in one process over a [`MemoryLink`]:
//!
//! 1. typed calls that resolve (`get_user`)
//! 2. a remote error (`send_message` with an empty text)
//! 3. a server-pushed `newNotification` event
//! 4. a disconnect while a call is in flight, then a reconnect

mod app;

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::app::{ChatApi, Message, Notification, User, NOTIFICATION_EVENT};
use typsio_bus::MemoryLink;
use typsio_client::{ClientConfig, RpcError, TypsioClient};
use typsio_server::{RpcServer, ServerConfig};
use typsio_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_service("typsio-demo"))
        .context("failed to initialize telemetry")?;

    let client_config = ClientConfig::from_env().context("invalid client configuration")?;
    let server_config = ServerConfig::default().with_rpc_event_name(&client_config.rpc_event_name);

    let link = MemoryLink::new();
    let registry = app::registry().context("failed to register methods")?;
    let server = RpcServer::serve_with_config(registry, link.server(), server_config)
        .context("invalid server configuration")?;
    info!(
        catalogue = %serde_json::to_string(&server.catalogue())?,
        "Methods available"
    );

    let client = TypsioClient::with_config(link.client(), client_config)
        .context("invalid client configuration")?;
    let api = ChatApi::new(&client);

    // 1. Typed calls
    let alice = api.get_user(1).await.context("get_user(1)")?;
    info!(user = ?alice, "get_user(1)");
    let nobody = api.get_user(2).await.context("get_user(2)")?;
    info!(user = ?nobody, "get_user(2)");

    // 2. Remote error
    let author = alice.unwrap_or(User {
        id: 0,
        name: "anonymous".to_string(),
    });
    let empty = Message {
        text: String::new(),
        user: author.clone(),
    };
    match api.send_message(&empty).await {
        Err(RpcError::Remote(reason)) => info!(reason = %reason, "send_message rejected"),
        other => warn!(result = ?other, "Unexpected send_message outcome"),
    }
    let hello = Message {
        text: "hello".to_string(),
        user: author,
    };
    let sent = api.send_message(&hello).await.context("send_message")?;
    info!(sent = sent, "send_message");

    // 3. Server push
    let mut notifications = client.subscribe(NOTIFICATION_EVENT);
    let notification = Notification {
        message: "Welcome!".to_string(),
    };
    server
        .push(NOTIFICATION_EVENT, serde_json::to_value(&notification)?)
        .context("push notification")?;
    if let Some(payload) = notifications.next().await {
        let notification: Notification = serde_json::from_value(payload)?;
        info!(message = %notification.message, "Notification received");
    }

    // 4. Disconnect while a call is pending
    let in_flight = client
        .dispatch_with_timeout("slow_echo", vec![json!("late"), json!(500)], Duration::from_secs(5))
        .context("dispatch slow_echo")?;
    let link = Arc::new(link);
    let dropper = link.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        dropper.disconnect();
    });
    match in_flight.await {
        Err(RpcError::ConnectionLost) => info!("In-flight call rejected on disconnect"),
        other => warn!(result = ?other, "Unexpected in-flight outcome"),
    }
    match client.invoke("get_user", vec![json!(1)]).await {
        Err(RpcError::NotConnected) => info!("Calls are refused while disconnected"),
        other => warn!(result = ?other, "Unexpected outcome while disconnected"),
    }

    link.reconnect();
    let again = api.get_user(1).await.context("get_user after reconnect")?;
    info!(user = ?again, stats = ?client.stats(), "Reconnected");

    Ok(())
}
