//! Coinbase Exchange polling provider (spec §4.2) — per-symbol
//! `products/{id}/ticker`, grounded on `cex/coinbase/types.rs`. Coinbase's
//! product id is dashed (`BTC-USD`); `symbol_fn` produces that form so the
//! pair-orientation decision in `Provider::set_pairs` matches the wire
//! symbol, matching the per-provider `symbolFn` contract (spec §4.1).

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

const DEFAULT_URL: &str = "https://api.exchange.coinbase.com";

fn dashed(pair: &CurrencyPair) -> String {
    format!("{}-{}", pair.base.to_uppercase(), pair.quote.to_uppercase())
}

#[derive(Debug, Deserialize)]
struct ProductTicker {
    price: String,
    volume: String,
}

pub struct Coinbase {
    provider: Provider,
}

impl Coinbase {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("coinbase", merged);
        let coinbase = Coinbase { provider };
        super::init_pairs(&coinbase, requested).await;
        coinbase
    }
}

#[async_trait]
impl CexPoll for Coinbase {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    fn symbol_fn(&self) -> SymbolFn {
        dashed
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        let now = SystemTime::now();
        let mut ticks = Vec::with_capacity(tracked.len());
        for symbol in tracked.keys() {
            let path = format!("products/{symbol}/ticker");
            let response: ProductTicker = match self.provider.http_get(&path).await {
                Ok(r) => r,
                Err(err) => {
                    log::warn!("coinbase: fetch {symbol} failed: {err}");
                    continue;
                }
            };
            ticks.push(RawTick::new(
                symbol.clone(),
                Decimal::from_str_truncating(&response.price),
                Decimal::from_str_truncating(&response.volume),
                now,
            ));
        }
        Ok(ticks)
    }
}
