//! Gate.io spot polling provider (spec §4.2) — bulk `spot/tickers`.

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

const DEFAULT_URL: &str = "https://api.gateio.ws/api/v4";

#[derive(Debug, Deserialize)]
struct SpotTicker {
    currency_pair: String,
    last: String,
    base_volume: String,
}

pub struct Gateio {
    provider: Provider,
}

impl Gateio {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("gateio", merged);
        let gateio = Gateio { provider };
        super::init_pairs(&gateio, requested).await;
        gateio
    }

    fn symbol(currency_pair: &str) -> String {
        currency_pair.replace('_', "")
    }
}

#[async_trait]
impl CexPoll for Gateio {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tickers: Vec<SpotTicker> = self.provider.http_get("spot/tickers").await?;
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        Ok(tickers
            .into_iter()
            .map(|t| (Self::symbol(&t.currency_pair), t))
            .filter(|(symbol, _)| tracked.contains_key(symbol))
            .map(|(symbol, t)| {
                RawTick::new(
                    symbol,
                    Decimal::from_str_truncating(&t.last),
                    Decimal::from_str_truncating(&t.base_volume),
                    now,
                )
            })
            .collect())
    }

    async fn available_pairs(&self) -> Result<HashSet<String>> {
        let tickers: Vec<SpotTicker> = self.provider.http_get("spot/tickers").await?;
        Ok(tickers.into_iter().map(|t| Self::symbol(&t.currency_pair)).collect())
    }
}
