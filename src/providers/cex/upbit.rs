//! Upbit polling provider (spec §4.2) — bulk `v1/ticker?markets=`, grounded
//! on `cex/upbit/types.rs`. Upbit market codes are `QUOTE-BASE` (reversed,
//! dashed — e.g. `KRW-BTC`); `symbol_fn` produces that form.

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use crate::provider::symbol::SymbolFn;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.upbit.com/v1";

fn market_code(pair: &CurrencyPair) -> String {
    format!("{}-{}", pair.quote.to_uppercase(), pair.base.to_uppercase())
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    market: String,
    trade_price: f64,
    acc_trade_volume_24h: f64,
}

pub struct Upbit {
    provider: Provider,
}

impl Upbit {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("upbit", merged);
        let upbit = Upbit { provider };
        super::init_pairs(&upbit, requested).await;
        upbit
    }
}

#[async_trait]
impl CexPoll for Upbit {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    fn symbol_fn(&self) -> SymbolFn {
        market_code
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        if tracked.is_empty() {
            return Ok(Vec::new());
        }
        let markets = tracked.keys().cloned().collect::<Vec<_>>().join(",");
        let entries: Vec<TickerEntry> = self
            .provider
            .http_get(&format!("ticker?markets={markets}"))
            .await?;
        let now = SystemTime::now();
        Ok(entries
            .into_iter()
            .filter(|t| tracked.contains_key(&t.market))
            .map(|t| {
                RawTick::new(
                    t.market,
                    Decimal::from_f64(t.trade_price),
                    Decimal::from_f64(t.acc_trade_volume_24h),
                    now,
                )
            })
            .collect())
    }
}
