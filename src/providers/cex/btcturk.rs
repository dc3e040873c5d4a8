//! BTCTurk polling provider (spec §4.2) — bulk `ticker`, filtered locally
//! since BTCTurk has no per-symbol ticker endpoint worth a separate request.

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

const DEFAULT_URL: &str = "https://api.btcturk.com/api/v2";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    data: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    pair: String,
    last: f64,
    volume: f64,
}

pub struct Btcturk {
    provider: Provider,
}

impl Btcturk {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("btcturk", merged);
        let btcturk = Btcturk { provider };
        super::init_pairs(&btcturk, requested).await;
        btcturk
    }

    async fn fetch_all(&self) -> Result<Vec<TickerEntry>> {
        let response: TickerResponse = self.provider.http_get("ticker").await?;
        Ok(response.data)
    }
}

#[async_trait]
impl CexPoll for Btcturk {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let entries = self.fetch_all().await?;
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        Ok(entries
            .into_iter()
            .filter(|t| tracked.contains_key(&t.pair))
            .map(|t| {
                RawTick::new(
                    t.pair,
                    Decimal::from_f64(t.last),
                    Decimal::from_f64(t.volume),
                    now,
                )
            })
            .collect())
    }

    async fn available_pairs(&self) -> Result<HashSet<String>> {
        let entries = self.fetch_all().await?;
        Ok(entries.into_iter().map(|t| t.pair).collect())
    }
}
