//! Websocket Controller — spec §4.4.
//!
//! Owns one connection for a streaming provider: dials, sends the initial
//! subscribe messages, dispatches inbound frames to the provider's handler,
//! sends keepalive pings on schedule, and reconnects with backoff on any
//! failure, replaying subscription state. Factored out as one reusable
//! component instead of being hand-rolled per provider — the teacher
//! inlines an equivalent loop directly inside each streaming provider (see
//! `src/cex/okx/mod.rs`), which is the shape this module generalizes.

use crate::endpoint::PingType;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

/// `Idle -> Dialing -> Subscribing -> Running -> (Reconnecting -> Dialing ...) -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsState {
    Idle,
    Dialing,
    Subscribing,
    Running,
    Reconnecting,
    Closed,
}

/// A handle for a provider's message handler to push frames back out over
/// the live connection (the controller's `SendJSON`, spec §4.2) — used to
/// echo a pong for an application-level ping.
#[derive(Clone, Default)]
pub struct WsOutbox(Arc<Mutex<Option<mpsc::UnboundedSender<WsMessage>>>>);

impl WsOutbox {
    async fn attach(&self, tx: mpsc::UnboundedSender<WsMessage>) {
        *self.0.lock().await = Some(tx);
    }

    async fn detach(&self) {
        *self.0.lock().await = None;
    }

    pub async fn send_json(&self, value: &Value) {
        self.send_text(value.to_string()).await;
    }

    pub async fn send_text(&self, text: String) {
        if let Some(tx) = self.0.lock().await.as_ref() {
            let _ = tx.send(WsMessage::Text(text));
        }
    }
}

/// Implemented by a streaming concrete provider (spec §4.2).
#[async_trait]
pub trait WsHandler: Send + Sync {
    /// Initial subscription payload(s), sent at first connect and at every
    /// reconnect.
    fn get_subscription_msgs(&self, pairs: &[crate::pair::CurrencyPair]) -> Vec<Value>;

    /// Dispatches one inbound text frame: subscribe-ack, heartbeat,
    /// data, or unknown — the handler decides which, and replies via
    /// `outbox` when the protocol calls for an application-level pong.
    async fn message_received(&self, text: &str, outbox: &WsOutbox);

    /// Binary frames (e.g. gzip-compressed payloads). Default: ignored.
    async fn binary_message_received(&self, _bytes: &[u8], _outbox: &WsOutbox) {}
}

pub struct WsControllerConfig {
    pub url: String,
    pub ping_duration: Duration,
    pub ping_type: PingType,
    pub ping_message: String,
}

/// Owns one websocket connection for a streaming provider.
pub struct WsController<H: WsHandler> {
    config: WsControllerConfig,
    handler: Arc<H>,
    subscriptions: RwLock<Vec<Value>>,
    outbox: WsOutbox,
    state: RwLock<WsState>,
    cancellation: CancellationToken,
}

impl<H: WsHandler + 'static> WsController<H> {
    pub fn new(config: WsControllerConfig, handler: Arc<H>, cancellation: CancellationToken) -> Self {
        WsController {
            config,
            handler,
            subscriptions: RwLock::new(Vec::new()),
            outbox: WsOutbox::default(),
            state: RwLock::new(WsState::Idle),
            cancellation,
        }
    }

    pub async fn state(&self) -> WsState {
        *self.state.read().await
    }

    /// `AddSubscriptionMsgs` (spec §4.4): appends to the tracked
    /// subscription list and, if currently connected, sends them
    /// immediately (the incremental-subscribe path for `SubscribeCurrencyPairs`).
    pub async fn add_subscription_msgs(&self, msgs: Vec<Value>) {
        for msg in &msgs {
            self.outbox.send_json(msg).await;
        }
        self.subscriptions.write().await.extend(msgs);
    }

    /// Runs the dial / subscribe / read / keepalive / reconnect loop until
    /// cancelled. Never returns before cancellation (or exhausting an
    /// internal bound in tests).
    pub async fn run(&self, initial_pairs: &[crate::pair::CurrencyPair]) {
        {
            let msgs = self.handler.get_subscription_msgs(initial_pairs);
            *self.subscriptions.write().await = msgs;
        }

        let mut backoff = Duration::from_secs(1);
        let max_backoff = Duration::from_secs(60);

        loop {
            if self.cancellation.is_cancelled() {
                *self.state.write().await = WsState::Closed;
                return;
            }

            *self.state.write().await = WsState::Dialing;
            let connected = tokio_tungstenite::connect_async(&self.config.url).await;

            let (ws_stream, _) = match connected {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("ws dial failed for {}: {e}", self.config.url);
                    if self.wait_backoff(&mut backoff, max_backoff).await {
                        return;
                    }
                    continue;
                }
            };

            backoff = Duration::from_secs(1);
            *self.state.write().await = WsState::Subscribing;

            let (mut write, mut read) = ws_stream.split();
            let subs = self.subscriptions.read().await.clone();
            let mut subscribe_failed = false;
            for msg in &subs {
                if write
                    .send(WsMessage::Text(msg.to_string()))
                    .await
                    .is_err()
                {
                    subscribe_failed = true;
                    break;
                }
            }
            if subscribe_failed {
                if self.wait_backoff(&mut backoff, max_backoff).await {
                    return;
                }
                continue;
            }

            *self.state.write().await = WsState::Running;
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();
            self.outbox.attach(out_tx).await;

            let mut ping_interval = if self.config.ping_duration.is_zero() {
                None
            } else {
                Some(tokio::time::interval(self.config.ping_duration))
            };

            loop {
                let next_ping = async {
                    match ping_interval.as_mut() {
                        Some(iv) => {
                            iv.tick().await;
                        }
                        None => futures::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = self.cancellation.cancelled() => {
                        let _ = write.close().await;
                        self.outbox.detach().await;
                        *self.state.write().await = WsState::Closed;
                        return;
                    }
                    out = out_rx.recv() => {
                        match out {
                            Some(msg) => {
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            None => {}
                        }
                    }
                    _ = next_ping => {
                        let ping_result = match self.config.ping_type {
                            PingType::Frame => write.send(WsMessage::Ping(Vec::new())).await,
                            PingType::Text => {
                                write.send(WsMessage::Text(self.config.ping_message.clone())).await
                            }
                        };
                        if ping_result.is_err() {
                            break;
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Ping(payload))) => {
                                let _ = write.send(WsMessage::Pong(payload)).await;
                            }
                            Some(Ok(WsMessage::Pong(_))) => {}
                            Some(Ok(WsMessage::Text(text))) => {
                                self.handler.message_received(&text, &self.outbox).await;
                            }
                            Some(Ok(WsMessage::Binary(bytes))) => {
                                self.handler.binary_message_received(&bytes, &self.outbox).await;
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Err(e)) => {
                                log::warn!("ws read error: {e}");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            self.outbox.detach().await;

            if self.cancellation.is_cancelled() {
                *self.state.write().await = WsState::Closed;
                return;
            }
            *self.state.write().await = WsState::Reconnecting;
            if self.wait_backoff(&mut backoff, max_backoff).await {
                return;
            }
        }
    }

    /// Sleeps `backoff`, doubling it (capped at `max_backoff`) for the next
    /// call. Returns `true` if cancellation fired during the wait.
    async fn wait_backoff(&self, backoff: &mut Duration, max_backoff: Duration) -> bool {
        tokio::select! {
            _ = self.cancellation.cancelled() => {
                *self.state.write().await = WsState::Closed;
                true
            }
            _ = tokio::time::sleep(*backoff) => {
                *backoff = std::cmp::min(max_backoff, *backoff * 2);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::CurrencyPair;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl WsHandler for EchoHandler {
        fn get_subscription_msgs(&self, _pairs: &[CurrencyPair]) -> Vec<Value> {
            vec![serde_json::json!({"op": "subscribe"})]
        }

        async fn message_received(&self, _text: &str, _outbox: &WsOutbox) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dial_failure_reaches_closed_on_cancel() {
        let handler = Arc::new(EchoHandler(Arc::new(AtomicUsize::new(0))));
        let cancellation = CancellationToken::new();
        let controller = WsController::new(
            WsControllerConfig {
                url: "ws://127.0.0.1:1".to_string(),
                ping_duration: Duration::ZERO,
                ping_type: PingType::Frame,
                ping_message: String::new(),
            },
            handler,
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
}
