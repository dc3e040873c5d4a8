//! Bitfinex polling provider (spec §4.2) — per-symbol `ticker/t{SYMBOL}`,
//! grounded on `cex/bitfinex/types.rs` (flat positional array responses).

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::{ProviderError, Result};
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use async_trait::async_trait;
use serde_json::Value;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api-pub.bitfinex.com/v2";

pub struct Bitfinex {
    provider: Provider,
}

impl Bitfinex {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("bitfinex", merged);
        let bitfinex = Bitfinex { provider };
        super::init_pairs(&bitfinex, requested).await;
        bitfinex
    }
}

#[async_trait]
impl CexPoll for Bitfinex {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        let mut ticks = Vec::with_capacity(tracked.len());
        for symbol in tracked.keys() {
            let path = format!("ticker/t{symbol}");
            let entry: Value = match self.provider.http_get(&path).await {
                Ok(r) => r,
                Err(err) => {
                    log::warn!("bitfinex: fetch {symbol} failed: {err}");
                    continue;
                }
            };
            let fields = entry.as_array().ok_or_else(|| {
                ProviderError::Decode(format!("bitfinex: unexpected ticker shape for {symbol}"))
            })?;
            // [BID, BID_SIZE, ASK, ASK_SIZE, DAILY_CHANGE, DAILY_CHANGE_RELATIVE,
            //  LAST_PRICE, VOLUME, HIGH, LOW]
            let (Some(last_price), Some(volume)) = (fields.get(6), fields.get(7)) else {
                continue;
            };
            let (Some(last_price), Some(volume)) = (last_price.as_f64(), volume.as_f64()) else {
                continue;
            };
            ticks.push(RawTick::new(
                symbol.clone(),
                Decimal::from_f64(last_price),
                Decimal::from_f64(volume),
                now,
            ));
        }
        Ok(ticks)
    }
}
