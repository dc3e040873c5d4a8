//! HTX (Huobi) polling provider (spec §4.2) — per-symbol
//! `market/detail/merged?symbol=`, grounded on `cex/htx/types.rs`.

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.huobi.pro";

#[derive(Debug, Deserialize)]
struct MergedResponse {
    tick: Option<MergedTick>,
}

#[derive(Debug, Deserialize)]
struct MergedTick {
    close: f64,
    vol: f64,
}

pub struct Htx {
    provider: Provider,
}

impl Htx {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("htx", merged);
        let htx = Htx { provider };
        super::init_pairs(&htx, requested).await;
        htx
    }
}

#[async_trait]
impl CexPoll for Htx {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        let mut ticks = Vec::with_capacity(tracked.len());
        for symbol in tracked.keys() {
            let path = format!("market/detail/merged?symbol={}", symbol.to_lowercase());
            let response: MergedResponse = match self.provider.http_get(&path).await {
                Ok(r) => r,
                Err(err) => {
                    log::warn!("htx: fetch {symbol} failed: {err}");
                    continue;
                }
            };
            let Some(tick) = response.tick else { continue };
            ticks.push(RawTick::new(
                symbol.clone(),
                Decimal::from_f64(tick.close),
                Decimal::from_f64(tick.vol),
                now,
            ));
        }
        Ok(ticks)
    }
}
