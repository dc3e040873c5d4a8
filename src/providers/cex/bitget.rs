//! Bitget spot polling provider (spec §4.2) — per-symbol
//! `spot/market/tickers?symbol=`, grounded on `cex/bitget/types.rs`.

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.bitget.com/api/v2";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    data: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    #[serde(rename = "lastPr")]
    last_pr: String,
    #[serde(rename = "baseVolume")]
    base_volume: String,
}

pub struct Bitget {
    provider: Provider,
}

impl Bitget {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("bitget", merged);
        let bitget = Bitget { provider };
        super::init_pairs(&bitget, requested).await;
        bitget
    }
}

#[async_trait]
impl CexPoll for Bitget {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        let mut ticks = Vec::with_capacity(tracked.len());
        for symbol in tracked.keys() {
            let path = format!("spot/market/tickers?symbol={symbol}");
            let response: TickerResponse = match self.provider.http_get(&path).await {
                Ok(r) => r,
                Err(err) => {
                    log::warn!("bitget: fetch {symbol} failed: {err}");
                    continue;
                }
            };
            let Some(entry) = response.data.into_iter().next() else {
                continue;
            };
            ticks.push(RawTick::new(
                symbol.clone(),
                Decimal::from_str_truncating(&entry.last_pr),
                Decimal::from_str_truncating(&entry.base_volume),
                now,
            ));
        }
        Ok(ticks)
    }
}
