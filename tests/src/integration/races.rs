//! # Settlement Races
//!
//! Every pending call is settled by whichever of reply, timeout, disconnect
//! sweep, cancel or drop gets to it first. These scenarios force the losing
//! paths to arrive afterwards and check they are ignored.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::time::Instant;

    use super::super::Harness;
    use typsio_bus::{CallMessage, MemoryLink, ReplyMessage, Transport};
    use typsio_client::{ClientConfig, RpcError, TypsioClient};

    /// Records every call message the server endpoint receives.
    fn record_calls(link: &MemoryLink) -> Arc<Mutex<Vec<CallMessage>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        link.server().on(
            "rpc_call",
            Arc::new(move |payload: Value| {
                if let Ok(call) = serde_json::from_value(payload) {
                    sink.lock().push(call);
                }
            }),
        );
        calls
    }

    fn reply(link: &MemoryLink, reply: &ReplyMessage) {
        link.server()
            .emit("rpc_call_response", serde_json::to_value(reply).unwrap())
            .unwrap();
    }

    async fn wait_for_calls(calls: &Mutex<Vec<CallMessage>>, n: usize) {
        while calls.lock().len() < n {
            tokio::task::yield_now().await;
        }
    }

    // =============================================================================
    // OUT OF ORDER / CONCURRENT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_replies_match_by_id() {
        let h = Harness::new();

        let delays = [40u64, 10, 30, 0, 20];
        let pending: Vec<_> = delays
            .iter()
            .map(|ms| h.client.dispatch("sleep", vec![json!(ms)]).unwrap())
            .collect();

        let results = join_all(pending).await;
        for (ms, result) in delays.iter().zip(results) {
            assert_eq!(result, Ok(json!(ms)));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_each_settle_once() {
        let h = Arc::new(Harness::new());

        let tasks: Vec<_> = (0..8)
            .map(|task| {
                let h = h.clone();
                tokio::spawn(async move {
                    let mut ids = Vec::new();
                    for i in 0..25u64 {
                        let reply = h.client.dispatch("sleep", vec![json!(i % 3)]).unwrap();
                        ids.push(reply.call_id().clone());
                        assert_eq!(reply.await, Ok(json!(i % 3)));
                    }
                    ids
                })
            })
            .collect();

        let mut all = HashSet::new();
        for task in join_all(tasks).await {
            for id in task.unwrap() {
                assert!(all.insert(id));
            }
        }

        assert_eq!(all.len(), 200);
        let stats = h.client.stats();
        assert_eq!(stats.resolved, 200);
        assert_eq!(stats.settled(), 200);
        assert_eq!(h.client.pending_count(), 0);
    }

    // =============================================================================
    // LATE AND DUPLICATE REPLIES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_timeout_is_ignored() {
        let h = Harness::with_timeout(Duration::from_millis(50));

        let result = h.client.invoke("sleep", vec![json!(80)]).await;
        assert!(matches!(result, Err(RpcError::Timeout { ref method, .. }) if method == "sleep"));

        // Let the server answer the call that already timed out
        tokio::time::sleep(Duration::from_millis(100)).await;
        let stats = h.client.stats();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.stale_replies, 1);
        assert_eq!(stats.resolved, 0);
    }

    #[tokio::test]
    async fn test_duplicate_reply_settles_once() {
        let link = MemoryLink::new();
        let calls = record_calls(&link);
        let client = TypsioClient::new(link.client());

        let pending = client.dispatch("m", vec![]).unwrap();
        wait_for_calls(&calls, 1).await;
        let call_id = calls.lock()[0].call_id.clone();

        reply(&link, &ReplyMessage::success(call_id.clone(), json!("first")));
        reply(&link, &ReplyMessage::failure(call_id, "second"));
        assert_eq!(pending.await, Ok(json!("first")));

        // Make sure the duplicate has been delivered before counting
        let marker = client.dispatch("marker", vec![]).unwrap();
        wait_for_calls(&calls, 2).await;
        let marker_id = calls.lock()[1].call_id.clone();
        reply(&link, &ReplyMessage::success(marker_id, Value::Null));
        marker.await.unwrap();

        let stats = client.stats();
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.remote_errors, 0);
        assert_eq!(stats.stale_replies, 1);
    }

    #[tokio::test]
    async fn test_reply_after_disconnect_is_ignored() {
        let link = MemoryLink::new();
        let calls = record_calls(&link);
        let client = TypsioClient::new(link.client());

        let pending = client.dispatch("m", vec![]).unwrap();
        wait_for_calls(&calls, 1).await;
        let call_id = calls.lock()[0].call_id.clone();

        link.disconnect();
        assert_eq!(pending.await, Err(RpcError::ConnectionLost));

        link.reconnect();
        reply(&link, &ReplyMessage::success(call_id, json!(1)));
        let marker = client.dispatch("marker", vec![]).unwrap();
        wait_for_calls(&calls, 2).await;
        let marker_id = calls.lock()[1].call_id.clone();
        reply(&link, &ReplyMessage::success(marker_id, Value::Null));
        marker.await.unwrap();

        let stats = client.stats();
        assert_eq!(stats.connection_lost, 1);
        assert_eq!(stats.stale_replies, 1);
    }

    #[tokio::test]
    async fn test_cancel_then_reply() {
        let link = MemoryLink::new();
        let calls = record_calls(&link);
        let client = TypsioClient::new(link.client());

        let pending = client.dispatch("m", vec![]).unwrap();
        let id = pending.call_id().clone();
        assert!(client.cancel(&id));
        assert_eq!(pending.await, Err(RpcError::Cancelled));

        wait_for_calls(&calls, 1).await;
        reply(&link, &ReplyMessage::success(id.as_str(), json!(1)));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_reply_handle_withdraws_call() {
        let h = Harness::new();

        let pending = h.client.dispatch("sleep", vec![json!(20)]).unwrap();
        assert_eq!(h.client.pending_count(), 1);
        drop(pending);
        assert_eq!(h.client.pending_count(), 0);

        // The server still answers; the reply finds nothing to settle
        tokio::time::sleep(Duration::from_millis(60)).await;
        let stats = h.client.stats();
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.stale_replies, 1);
    }

    // =============================================================================
    // SWEEP / RECONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_sweep_rejects_every_pending_call() {
        let h = Harness::new();

        let pending: Vec<_> = (0..50)
            .map(|_| h.client.dispatch("never", vec![]).unwrap())
            .collect();
        assert_eq!(h.client.pending_count(), 50);

        h.link.disconnect();
        for result in join_all(pending).await {
            assert_eq!(result, Err(RpcError::ConnectionLost));
        }
        assert_eq!(h.client.pending_count(), 0);
        assert_eq!(h.client.stats().connection_lost, 50);
    }

    #[tokio::test]
    async fn test_call_after_quick_reconnect_is_not_swept() {
        let h = Harness::new();
        let before = h.client.dispatch("never", vec![]).unwrap();

        h.link.disconnect();
        h.link.reconnect();
        let after = h.client.dispatch("get_user", vec![json!(1)]).unwrap();

        assert_eq!(before.await, Err(RpcError::ConnectionLost));
        assert_eq!(after.await.unwrap()["id"], 1);
        assert_eq!(h.client.stats().connection_lost, 1);
    }

    #[tokio::test]
    async fn test_call_ids_unique_across_reconnects() {
        let link = MemoryLink::new();
        let calls = record_calls(&link);
        let client = TypsioClient::new(link.client());

        let mut sessions = HashSet::new();
        let mut expected = 0;
        for _ in 0..3 {
            sessions.insert(link.client().session_id().unwrap());
            for _ in 0..10 {
                let _ = client.dispatch("m", vec![]).unwrap();
                expected += 1;
            }
            wait_for_calls(&calls, expected).await;
            link.disconnect();
            link.reconnect();
        }

        assert_eq!(sessions.len(), 3);
        let ids: HashSet<_> = calls.lock().iter().map(|c| c.call_id.clone()).collect();
        assert_eq!(ids.len(), 30);
    }

    // =============================================================================
    // TIMEOUT FIDELITY
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_at_deadline() {
        let timeout = Duration::from_millis(250);
        let h = Harness::with_timeout(timeout);

        let started = Instant::now();
        let result = h.client.invoke("never", vec![]).await;
        let elapsed = started.elapsed();

        assert_eq!(
            result,
            Err(RpcError::Timeout {
                method: "never".into(),
                timeout
            })
        );
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(5));
        assert_eq!(
            result.unwrap_err().to_string(),
            "rpc call 'never' timed out after 250ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_before_deadline_cancels_timer() {
        let h = Harness::with_timeout(Duration::from_millis(100));

        assert_eq!(h.client.invoke("sleep", vec![json!(90)]).await, Ok(json!(90)));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let stats = h.client.stats();
        assert_eq!(stats.timeouts, 0);
        assert_eq!(stats.resolved, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout() {
        let link = MemoryLink::new();
        let client = TypsioClient::with_config(
            link.client(),
            ClientConfig::default().with_timeout(Duration::from_secs(60)),
        )
        .unwrap();

        let started = Instant::now();
        let result = client
            .dispatch_with_timeout("m", vec![], Duration::from_millis(30))
            .unwrap()
            .await;
        assert!(matches!(result, Err(RpcError::Timeout { timeout, .. }) if timeout == Duration::from_millis(30)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
