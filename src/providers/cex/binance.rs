//! Binance streaming provider (spec §4.2, §4.4) — combined `bookTicker`
//! stream over [`crate::ws::WsController`], replacing the teacher's inlined
//! per-provider reconnect loop (`cex/binance/mod.rs`) with the shared
//! controller plus a thin [`WsHandler`].

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

const DEFAULT_REST_URL: &str = "https://api.binance.com/api/v3";
const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/stream";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
}

struct BinanceHandler {
    provider: Arc<Provider>,
}

#[async_trait]
impl WsHandler for BinanceHandler {
    fn get_subscription_msgs(&self, pairs: &[CurrencyPair]) -> Vec<Value> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let params: Vec<String> = pairs
            .iter()
            .map(|p| format!("{}@bookTicker", p.canonical().to_lowercase()))
            .collect();
        vec![json!({"method": "SUBSCRIBE", "params": params, "id": 1})]
    }

    async fn message_received(&self, text: &str, _outbox: &WsOutbox) {
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return;
        };
        let Some(stream) = value.get("stream").and_then(Value::as_str) else {
            return;
        };
        let Some(data) = value.get("data") else {
            return;
        };
        let symbol = stream.split('@').next().unwrap_or_default().to_uppercase();
        let (Some(bid_str), Some(ask_str)) = (
            data.get("b").and_then(Value::as_str),
            data.get("a").and_then(Value::as_str),
        ) else {
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
        // bookTicker carries no volume field; 0 is the documented
        // "unknown" sentinel (spec §3).
        self.provider
            .set_ticker_price(&symbol, mid, Decimal::ZERO, SystemTime::now())
            .await;
    }
}

/// Binance streaming provider. `spawn` performs the REST pair-discovery
/// step and starts the websocket controller task; the returned handle is
/// the `ProviderHandle` the outer oracle layer holds.
pub struct Binance {
    provider: Arc<Provider>,
    controller: Arc<WsController<BinanceHandler>>,
}

impl Binance {
    pub async fn spawn(endpoint: Endpoint, requested: &[CurrencyPair]) -> Arc<Binance> {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_REST_URL.to_string()],
            websocket: Some(DEFAULT_WS_URL.to_string()),
            ping_duration: std::time::Duration::from_secs(20),
            ping_type: PingType::Frame,
            ..Endpoint::default()
        });
        let provider = Arc::new(Provider::new("binance", merged));

        let available = Self::fetch_available_pairs(&provider).await.unwrap_or_default();
        provider
            .set_pairs(requested, &available, crate::provider::symbol::canonical)
            .await;

        let handler = Arc::new(BinanceHandler {
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

        Arc::new(Binance { provider, controller })
    }

    async fn fetch_available_pairs(provider: &Provider) -> Result<HashSet<String>> {
        let info: ExchangeInfo = provider.http_get("exchangeInfo").await?;
        Ok(info.symbols.into_iter().map(|s| s.symbol).collect())
    }
}

#[async_trait]
impl ProviderHandle for Binance {
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
                BinanceHandler {
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
