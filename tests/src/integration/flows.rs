//! # Integration Test Flows
//!
//! Client and server wired over a `MemoryLink`:
//!
//! 1. **Call → reply**: `get_user(1)` resolves with the server's value
//! 2. **Call → remote error**: `send_message` with an empty text rejects verbatim
//! 3. **Disconnect before reply**: the pending call rejects with `ConnectionLost`
//! 4. **Server push**: named events reach `on` listeners and event streams
//! 5. **Reconnect**: calls are refused while down and work again afterwards

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use super::super::{Harness, Message, User};
    use typsio_bus::MemoryLink;
    use typsio_client::{ClientConfig, RemoteInvoker, RpcError, TypsioClient};
    use typsio_server::{HandlerError, RpcServer, ServerConfig};

    // =============================================================================
    // CALL / REPLY
    // =============================================================================

    #[tokio::test]
    async fn test_get_user_resolves() {
        let h = Harness::new();

        let user = h.client.invoke("get_user", vec![json!(1)]).await.unwrap();
        assert_eq!(user, json!({"id": 1, "name": "a"}));

        let typed: Option<User> = h.client.invoke_as("get_user", vec![json!(1)]).await.unwrap();
        assert_eq!(
            typed,
            Some(User {
                id: 1,
                name: "a".into()
            })
        );

        assert_eq!(h.client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_null_result_is_success() {
        let h = Harness::new();
        let user = h.client.invoke("get_user", vec![json!(2)]).await.unwrap();
        assert_eq!(user, Value::Null);

        let typed: Option<User> = h.client.invoke_as("get_user", vec![json!(2)]).await.unwrap();
        assert_eq!(typed, None);
    }

    #[tokio::test]
    async fn test_send_message_rejects_with_remote_error() {
        let h = Harness::new();

        let err = h
            .client
            .invoke("send_message", vec![json!({"text": ""})])
            .await
            .unwrap_err();
        assert_eq!(err, RpcError::Remote("invalid payload".into()));
        assert_eq!(err.to_string(), "invalid payload");

        let ok = h
            .client
            .invoke("send_message", vec![json!({"text": "hi"})])
            .await
            .unwrap();
        assert_eq!(ok, json!(true));

        let stats = h.client.stats();
        assert_eq!(stats.remote_errors, 1);
        assert_eq!(stats.resolved, 1);
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_arguments() {
        let h = Harness::new();

        let err = h.client.invoke("get_users", vec![]).await.unwrap_err();
        assert_eq!(err, RpcError::Remote("method 'get_users' not found".into()));

        let err = h
            .client
            .invoke("get_user", vec![json!("one")])
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Remote(ref m) if m.starts_with("invalid arguments for 'get_user'")));
    }

    #[tokio::test]
    async fn test_handler_error_without_message_rejects() {
        let link = MemoryLink::new();
        let mut registry = super::super::chat_registry();
        registry
            .register_fn("bad", |_| async { Err(HandlerError::new("")) })
            .unwrap();
        let _server = RpcServer::serve(registry, link.server());
        let client = TypsioClient::new(link.client());

        let err = client.invoke("bad", vec![]).await.unwrap_err();
        assert_eq!(err, RpcError::Remote("method 'bad' failed".into()));
        assert_eq!(client.stats().remote_errors, 1);
    }

    #[tokio::test]
    async fn test_decode_error_for_wrong_result_type() {
        let h = Harness::new();
        let result: Result<u64, _> = h.client.invoke_as("get_user", vec![json!(1)]).await;
        assert!(matches!(result, Err(RpcError::Decode { ref method, .. }) if method == "get_user"));
    }

    #[tokio::test]
    async fn test_custom_rpc_event_name() {
        let link = MemoryLink::new();
        let _server = RpcServer::serve_with_config(
            super::super::chat_registry(),
            link.server(),
            ServerConfig::default().with_rpc_event_name("chat_rpc"),
        )
        .unwrap();
        let client = TypsioClient::with_config(
            link.client(),
            ClientConfig::default().with_rpc_event_name("chat_rpc"),
        )
        .unwrap();

        let user = client.invoke("get_user", vec![json!(1)]).await.unwrap();
        assert_eq!(user["name"], "a");
        assert_eq!(link.client().listener_count("chat_rpc_response"), 1);
    }

    #[tokio::test]
    async fn test_two_clients_share_nothing() {
        let a = Harness::new();
        let b = Harness::new();

        let (ra, rb) = tokio::join!(
            a.client.invoke("sleep", vec![json!(5)]),
            b.client.invoke("get_user", vec![json!(1)])
        );
        assert_eq!(ra.unwrap(), json!(5));
        assert_eq!(rb.unwrap()["id"], 1);
    }

    // =============================================================================
    // DISCONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_disconnect_before_reply_rejects_promptly() {
        let h = Harness::new();

        let pending = h.client.dispatch("never", vec![]).unwrap();
        h.link.disconnect();

        let result = timeout(Duration::from_secs(1), pending)
            .await
            .expect("rejected well before the call timeout");
        assert_eq!(result, Err(RpcError::ConnectionLost));
        assert_eq!(h.client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_calls_refused_while_disconnected() {
        let h = Harness::new();
        h.link.disconnect();
        assert!(!h.client.is_connected());

        let sent_before = h.link.client().events_sent();
        let err = h.client.invoke("get_user", vec![json!(1)]).await.unwrap_err();

        assert_eq!(err, RpcError::NotConnected);
        assert_eq!(h.link.client().events_sent(), sent_before);
        assert_eq!(h.client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_resumes_calls() {
        let h = Harness::new();
        let first = h.client.dispatch("never", vec![]).unwrap();
        let first_id = first.call_id().clone();

        h.link.disconnect();
        assert_eq!(first.await, Err(RpcError::ConnectionLost));

        assert!(h.link.reconnect());
        let second = h.client.dispatch("get_user", vec![json!(1)]).unwrap();
        assert_ne!(second.call_id(), &first_id);
        assert_eq!(second.await.unwrap()["id"], 1);
    }

    // =============================================================================
    // SERVER PUSH
    // =============================================================================

    #[tokio::test]
    async fn test_server_push_reaches_listeners() {
        let h = Harness::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.client.on("newNotification", move |payload| {
            sink.lock().push(payload);
        });
        let mut stream = h.client.subscribe("newNotification");

        h.server
            .push("newNotification", json!({"message": "one"}))
            .unwrap();
        h.server
            .push("newNotification", json!({"message": "two"}))
            .unwrap();

        assert_eq!(stream.next().await.unwrap()["message"], "one");
        assert_eq!(stream.next().await.unwrap()["message"], "two");
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_push_does_not_disturb_pending_calls() {
        let h = Harness::new();
        let pending = h.client.dispatch("sleep", vec![json!(10)]).unwrap();

        // A push on the response event name is just a reply without a known id
        h.server
            .push("rpc_call_response", json!({"call_id": "nobody", "result": 1}))
            .unwrap();
        h.server.push("newNotification", json!({})).unwrap();

        assert_eq!(pending.await, Ok(json!(10)));
    }

    // =============================================================================
    // TYPED WRAPPERS
    // =============================================================================

    /// Shape of a generated client wrapper
    struct ChatApi<'a, R: RemoteInvoker>(&'a R);

    impl<R: RemoteInvoker> ChatApi<'_, R> {
        async fn get_user(&self, user_id: u64) -> Result<Option<User>, RpcError> {
            self.0.invoke_as("get_user", vec![json!(user_id)]).await
        }

        async fn send_message(&self, message: Message) -> Result<bool, RpcError> {
            self.0
                .invoke_as("send_message", vec![serde_json::to_value(message).unwrap()])
                .await
        }
    }

    #[tokio::test]
    async fn test_typed_wrapper_over_client() {
        let h = Harness::new();
        let api = ChatApi(&h.client);

        assert_eq!(api.get_user(1).await.unwrap().unwrap().name, "a");
        assert!(api
            .send_message(Message {
                text: "hello".into()
            })
            .await
            .unwrap());
        assert_eq!(
            api.send_message(Message { text: String::new() }).await,
            Err(RpcError::Remote("invalid payload".into()))
        );
    }
}
