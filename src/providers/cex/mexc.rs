//! MEXC spot polling provider (spec §4.2) — bulk `ticker/24hr`, grounded on
//! `cex/mexc/types.rs`'s `MexcBookTickerResponse` field names.

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.mexc.com/api/v3";

#[derive(Debug, Deserialize)]
struct Ticker24h {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    volume: String,
}

pub struct Mexc {
    provider: Provider,
}

impl Mexc {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("mexc", merged);
        let mexc = Mexc { provider };
        super::init_pairs(&mexc, requested).await;
        mexc
    }
}

#[async_trait]
impl CexPoll for Mexc {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tickers: Vec<Ticker24h> = self.provider.http_get("ticker/24hr").await?;
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        Ok(tickers
            .into_iter()
            .filter(|t| tracked.contains_key(&t.symbol))
            .map(|t| {
                RawTick::new(
                    t.symbol,
                    Decimal::from_str_truncating(&t.last_price),
                    Decimal::from_str_truncating(&t.volume),
                    now,
                )
            })
            .collect())
    }

    async fn available_pairs(&self) -> Result<HashSet<String>> {
        let tickers: Vec<Ticker24h> = self.provider.http_get("ticker/24hr").await?;
        Ok(tickers.into_iter().map(|t| t.symbol).collect())
    }
}
