//! KuCoin spot polling provider (spec §4.2) — bulk `market/allTickers`.

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::{ProviderError, Result};
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.kucoin.com/api/v1";

#[derive(Debug, Deserialize)]
struct AllTickersResponse {
    data: AllTickersData,
}

#[derive(Debug, Deserialize)]
struct AllTickersData {
    ticker: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    symbol: String,
    last: Option<String>,
    #[serde(rename = "volValue")]
    vol_value: Option<String>,
}

pub struct Kucoin {
    provider: Provider,
}

impl Kucoin {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("kucoin", merged);
        let kucoin = Kucoin { provider };
        super::init_pairs(&kucoin, requested).await;
        kucoin
    }

    fn symbol(raw: &str) -> String {
        raw.replace('-', "")
    }

    async fn fetch_all(&self) -> Result<Vec<TickerEntry>> {
        let response: AllTickersResponse = self.provider.http_get("market/allTickers").await?;
        Ok(response.data.ticker)
    }
}

#[async_trait]
impl CexPoll for Kucoin {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let entries = self.fetch_all().await?;
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        Ok(entries
            .into_iter()
            .filter_map(|t| {
                let symbol = Self::symbol(&t.symbol);
                if !tracked.contains_key(&symbol) {
                    return None;
                }
                let last = t.last?;
                let vol = t.vol_value.unwrap_or_default();
                Some(RawTick::new(
                    symbol,
                    Decimal::from_str_truncating(&last),
                    Decimal::from_str_truncating(&vol),
                    now,
                ))
            })
            .collect())
    }

    async fn available_pairs(&self) -> Result<HashSet<String>> {
        let entries = self.fetch_all().await.map_err(|e| match e {
            ProviderError::Decode(msg) => ProviderError::Decode(format!("kucoin allTickers: {msg}")),
            other => other,
        })?;
        Ok(entries.into_iter().map(|t| Self::symbol(&t.symbol)).collect())
    }
}
