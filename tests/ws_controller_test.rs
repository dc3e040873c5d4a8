//! Spec §4.4 Websocket Controller: dial, subscribe, dispatch, and shut down
//! cleanly on cancellation, against a real local websocket server.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use price_feed_core::endpoint::PingType;
use price_feed_core::pair::CurrencyPair;
use price_feed_core::ws::{WsController, WsControllerConfig, WsHandler, WsOutbox, WsState};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

struct RecordingHandler {
    received: Arc<AtomicUsize>,
}

#[async_trait]
impl WsHandler for RecordingHandler {
    fn get_subscription_msgs(&self, pairs: &[CurrencyPair]) -> Vec<Value> {
        pairs
            .iter()
            .map(|p| serde_json::json!({"op": "subscribe", "symbol": p.canonical()}))
            .collect()
    }

    async fn message_received(&self, _text: &str, _outbox: &WsOutbox) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn controller_subscribes_and_dispatches_against_a_real_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // First frame in is the replayed subscription message.
        let subscribe_msg = ws.next().await.unwrap().unwrap();
        assert!(matches!(subscribe_msg, WsMessage::Text(_)));

        // Push one data frame back for the handler to count.
        ws.send(WsMessage::Text(r#"{"type":"tick"}"#.to_string()))
            .await
            .unwrap();

        // Keep the connection open until the client closes it.
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, WsMessage::Close(_)) {
                break;
            }
        }
    });

    let received = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(RecordingHandler {
        received: received.clone(),
    });
    let cancellation = CancellationToken::new();
    let controller = Arc::new(WsController::new(
        WsControllerConfig {
            url: format!("ws://{addr}"),
            ping_duration: Duration::ZERO,
            ping_type: PingType::Frame,
            ping_message: String::new(),
        },
        handler,
        cancellation.clone(),
    ));

    let pairs = vec![CurrencyPair::new("BTC", "USDT")];
    let run_controller = controller.clone();
    let run = tokio::spawn(async move {
        run_controller.run(&pairs).await;
    });

    // Give the controller time to dial, subscribe, and receive the tick.
    let mut waited = Duration::ZERO;
    while received.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert_eq!(received.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state().await, WsState::Running);

    cancellation.cancel();
    run.await.unwrap();
    server.await.unwrap();
    assert_eq!(controller.state().await, WsState::Closed);
}

#[tokio::test]
async fn dial_failure_against_a_closed_port_reaches_closed_on_cancel() {
    struct NoopHandler;
    #[async_trait]
    impl WsHandler for NoopHandler {
        fn get_subscription_msgs(&self, _pairs: &[CurrencyPair]) -> Vec<Value> {
            Vec::new()
        }
        async fn message_received(&self, _text: &str, _outbox: &WsOutbox) {}
    }

    let cancellation = CancellationToken::new();
    let controller = WsController::new(
        WsControllerConfig {
            url: "ws://127.0.0.1:1".to_string(),
            ping_duration: Duration::ZERO,
            ping_type: PingType::Frame,
            ping_message: String::new(),
        },
        Arc::new(NoopHandler),
        cancellation.clone(),
    );

    let pairs = vec![CurrencyPair::new("BTC", "USDT")];
    let run = tokio::spawn(async move {
        controller.run(&pairs).await;
        controller
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancellation.cancel();
    let controller = run.await.unwrap();
    assert_eq!(controller.state().await, WsState::Closed);
}
