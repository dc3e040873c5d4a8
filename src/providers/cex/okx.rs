//! OKX streaming provider (spec §4.2, §4.4) — `books5` channel over
//! [`crate::ws::WsController`], replacing the teacher's inlined reconnect
//! loop (`cex/okx/mod.rs`) with the shared controller. OKX's `instId` wire
//! symbol is dashed (`BTC-USDT`); `symbol_fn` produces that form.

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

const DEFAULT_REST_URL: &str = "https://www.okx.com/api/v5";
const DEFAULT_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";

fn dashed(pair: &CurrencyPair) -> String {
    format!("{}-{}", pair.base.to_uppercase(), pair.quote.to_uppercase())
}

#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    data: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct Instrument {
    #[serde(rename = "instId")]
    inst_id: String,
}

struct OkxHandler {
    provider: Arc<Provider>,
}

fn json_f64(v: &Value) -> Option<f64> {
    v.as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| v.as_f64())
}

#[async_trait]
impl WsHandler for OkxHandler {
    fn get_subscription_msgs(&self, pairs: &[CurrencyPair]) -> Vec<Value> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let args: Vec<Value> = pairs
            .iter()
            .map(|p| json!({"channel": "books5", "instId": dashed(p)}))
            .collect();
        vec![json!({"op": "subscribe", "args": args})]
    }

    async fn message_received(&self, text: &str, _outbox: &WsOutbox) {
        if text == "pong" {
            return;
        }
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            return;
        };
        if value.get("event").and_then(Value::as_str).is_some() {
            return;
        }
        let Some(data) = value.get("data").and_then(Value::as_array) else {
            return;
        };
        let arg_inst = value
            .get("arg")
            .and_then(|a| a.get("instId"))
            .and_then(Value::as_str);

        for item in data {
            let Some(inst_id) = item.get("instId").and_then(Value::as_str).or(arg_inst) else {
                continue;
            };
            let (Some(bids), Some(asks)) = (
                item.get("bids").and_then(Value::as_array),
                item.get("asks").and_then(Value::as_array),
            ) else {
                continue;
            };
            let (Some(bid_entry), Some(ask_entry)) = (
                bids.first().and_then(Value::as_array),
                asks.first().and_then(Value::as_array),
            ) else {
                continue;
            };
            let (Some(bid), Some(ask)) = (
                bid_entry.first().and_then(json_f64),
                ask_entry.first().and_then(json_f64),
            ) else {
                continue;
            };
            if bid <= 0.0 || ask <= 0.0 {
                continue;
            }
            let mid = Decimal::from_f64((bid + ask) / 2.0);
            self.provider
                .set_ticker_price(inst_id, mid, Decimal::ZERO, SystemTime::now())
                .await;
        }
    }
}

pub struct Okx {
    provider: Arc<Provider>,
    controller: Arc<WsController<OkxHandler>>,
}

impl Okx {
    pub async fn spawn(endpoint: Endpoint, requested: &[CurrencyPair]) -> Arc<Okx> {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_REST_URL.to_string()],
            websocket: Some(DEFAULT_WS_URL.to_string()),
            ping_duration: std::time::Duration::from_secs(20),
            ping_type: PingType::Frame,
            ..Endpoint::default()
        });
        let provider = Arc::new(Provider::new("okx", merged));

        let available = Self::fetch_available_pairs(&provider).await.unwrap_or_default();
        provider.set_pairs(requested, &available, dashed).await;

        let handler = Arc::new(OkxHandler {
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

        Arc::new(Okx { provider, controller })
    }

    async fn fetch_available_pairs(provider: &Provider) -> Result<HashSet<String>> {
        let response: InstrumentsResponse = provider.http_get("public/instruments?instType=SPOT").await?;
        Ok(response.data.into_iter().map(|i| i.inst_id).collect())
    }
}

#[async_trait]
impl ProviderHandle for Okx {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice> {
        self.provider.get_ticker_prices(pairs).await
    }

    async fn subscribe_currency_pairs(&self, pairs: Vec<CurrencyPair>) -> Result<()> {
        let available = Self::fetch_available_pairs(&self.provider).await.unwrap_or_default();
        self.provider.subscribe_pairs(&pairs, &available, dashed).await;
        self.controller
            .add_subscription_msgs(
                OkxHandler {
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
