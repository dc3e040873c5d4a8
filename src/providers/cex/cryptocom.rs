//! Crypto.com Exchange polling provider (spec §4.2) — bulk
//! `public/get-tickers`, grounded on `cex/cryptocom/types.rs`'s nested
//! `result.data` shape.

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

const DEFAULT_URL: &str = "https://api.crypto.com/exchange/v1";

#[derive(Debug, Deserialize)]
struct TickersResponse {
    result: TickersResult,
}

#[derive(Debug, Deserialize)]
struct TickersResult {
    data: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    /// Instrument name, e.g. `BTC_USDT`.
    i: String,
    /// Last trade price.
    a: String,
    /// 24h trade volume.
    v: String,
}

pub struct Cryptocom {
    provider: Provider,
}

impl Cryptocom {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("cryptocom", merged);
        let cryptocom = Cryptocom { provider };
        super::init_pairs(&cryptocom, requested).await;
        cryptocom
    }

    fn symbol(instrument_name: &str) -> String {
        instrument_name.replace('_', "")
    }

    async fn fetch_all(&self) -> Result<Vec<TickerEntry>> {
        let response: TickersResponse = self.provider.http_get("public/get-tickers").await?;
        Ok(response.result.data)
    }
}

#[async_trait]
impl CexPoll for Cryptocom {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let entries = self.fetch_all().await?;
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        Ok(entries
            .into_iter()
            .map(|t| (Self::symbol(&t.i), t))
            .filter(|(symbol, _)| tracked.contains_key(symbol))
            .map(|(symbol, t)| {
                RawTick::new(
                    symbol,
                    Decimal::from_str_truncating(&t.a),
                    Decimal::from_str_truncating(&t.v),
                    now,
                )
            })
            .collect())
    }

    async fn available_pairs(&self) -> Result<HashSet<String>> {
        let entries = self.fetch_all().await?;
        Ok(entries.into_iter().map(|t| Self::symbol(&t.i)).collect())
    }
}
