//! Bybit streaming provider (spec §4.2, §4.4) — v5 public `tickers` topic
//! over [`crate::ws::WsController`]. Field names (`bid1Price`, `ask1Price`,
//! `volume24h`) are grounded on the teacher's REST ticker shape
//! (`cex/bybit/types.rs`'s `BybitTickerData`); Bybit's public ws pushes the
//! same fields under `data` on each `tickers.{symbol}` topic update. Bybit
//! requires an application-level `{"op":"ping"}` text frame roughly every
//! 20s rather than relying on protocol pings.

use crate::decimal::Decimal;
use crate::endpoint::{Endpoint, PingType};
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::{Provider, ProviderHandle};
use crate::ticker::TickerPrice;
use crate::ws::{WsController, WsControllerConfig, WsHandler, WsOutbox};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

const DEFAULT_REST_URL: &str = "https://api.bybit.com/v5";
const DEFAULT_WS_URL: &str = "wss://stream.bybit.com/v5/public/spot";

#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    result: InstrumentsResult,
}

#[derive(Debug, Deserialize)]
struct InstrumentsResult {
    list: Vec<InstrumentInfo>,
}

#[derive(Debug, Deserialize)]
struct InstrumentInfo {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    symbol: String,
    #[serde(rename = "bid1Price")]
    bid1_price: Option<String>,
    #[serde(rename = "ask1Price")]
    ask1_price: Option<String>,
    #[serde(rename = "volume24h")]
    volume_24h: Option<String>,
}

struct BybitHandler {
    provider: Arc<Provider>,
}

#[async_trait]
impl WsHandler for BybitHandler {
    fn get_subscription_msgs(&self, pairs: &[CurrencyPair]) -> Vec<Value> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let args: Vec<String> = pairs
            .iter()
            .map(|p| format!("tickers.{}", p.canonical()))
            .collect();
        vec![json!({"op": "subscribe", "args": args})]
    }

    async fn message_received(&self, text: &str, _outbox: &WsOutbox) {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return;
        };
        if value.get("op").and_then(Value::as_str) == Some("pong") {
            return;
        }
        let Some(topic) = value.get("topic").and_then(Value::as_str) else {
            return;
        };
        if !topic.starts_with("tickers.") {
            return;
        }
        let Some(data) = value.get("data") else {
            return;
        };
        let Ok(ticker) = serde_json::from_value::<TickerData>(data.clone()) else {
            return;
        };
        let (Some(bid_str), Some(ask_str)) = (&ticker.bid1_price, &ticker.ask1_price) else {
            // Delta updates may omit quote fields when unchanged; nothing
            // to update this tick.
            return;
        };
        let bid = Decimal::from_str_truncating(bid_str);
        let ask = Decimal::from_str_truncating(ask_str);
        if bid.is_nil() || ask.is_nil() || !bid.is_positive() || !ask.is_positive() {
            return;
        }
        let mid = bid
            .checked_add(&ask)
            .checked_div(&Decimal::from_str_truncating("2"));
        let volume = ticker
            .volume_24h
            .as_deref()
            .map(Decimal::from_str_truncating)
            .unwrap_or(Decimal::ZERO);
        self.provider
            .set_ticker_price(&ticker.symbol, mid, volume, SystemTime::now())
            .await;
    }
}

pub struct Bybit {
    provider: Arc<Provider>,
    controller: Arc<WsController<BybitHandler>>,
}

impl Bybit {
    pub async fn spawn(endpoint: Endpoint, requested: &[CurrencyPair]) -> Arc<Bybit> {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_REST_URL.to_string()],
            websocket: Some(DEFAULT_WS_URL.to_string()),
            ping_duration: std::time::Duration::from_secs(20),
            ping_type: PingType::Text,
            ping_message: r#"{"op":"ping"}"#.to_string(),
            ..Endpoint::default()
        });
        let provider = Arc::new(Provider::new("bybit", merged));

        let available = Self::fetch_available_pairs(&provider).await.unwrap_or_default();
        provider
            .set_pairs(requested, &available, crate::provider::symbol::canonical)
            .await;

        let handler = Arc::new(BybitHandler {
            provider: provider.clone(),
        });
        let ws_url = provider.endpoint.websocket.clone().unwrap_or_default();
        let controller = Arc::new(WsController::new(
            WsControllerConfig {
                url: ws_url,
                ping_duration: provider.endpoint.ping_duration,
                ping_type: provider.endpoint.ping_type,
                ping_message: provider.endpoint.ping_message.clone(),
            },
            handler,
            provider.cancellation.clone(),
        ));

        let pairs = provider.get_all_pairs().await.values().cloned().collect::<Vec<_>>();
        let run_controller = controller.clone();
        tokio::spawn(async move {
            run_controller.run(&pairs).await;
        });

        Arc::new(Bybit { provider, controller })
    }

    async fn fetch_available_pairs(provider: &Provider) -> Result<HashSet<String>> {
        let response: InstrumentsResponse = provider
            .http_get("market/instruments-info?category=spot")
            .await?;
        Ok(response.result.list.into_iter().map(|i| i.symbol).collect())
    }
}

#[async_trait]
impl ProviderHandle for Bybit {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice> {
        self.provider.get_ticker_prices(pairs).await
    }

    async fn subscribe_currency_pairs(&self, pairs: Vec<CurrencyPair>) -> Result<()> {
        let available = Self::fetch_available_pairs(&self.provider).await.unwrap_or_default();
        self.provider
            .subscribe_pairs(&pairs, &available, crate::provider::symbol::canonical)
            .await;
        self.controller
            .add_subscription_msgs(
                BybitHandler {
                    provider: self.provider.clone(),
                }
                .get_subscription_msgs(&pairs),
            )
            .await;
        Ok(())
    }

    async fn get_available_pairs(&self) -> Result<HashSet<String>> {
        Self::fetch_available_pairs(&self.provider).await
    }
}
