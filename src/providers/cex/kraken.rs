//! Kraken spot polling provider (spec §4.2) — bulk `0/public/Ticker?pair=`,
//! grounded on `cex/kraken/types.rs`'s nested `result` map. Kraken uses a
//! legacy asset-code table for a handful of majors (`BTC` -> `XBT`,
//! `DOGE` -> `XDG`); `symbol_fn` applies it before the pair ever touches
//! [`Provider`] state, per the per-provider `symbolFn` contract (spec §4.1).

use super::{CexPoll, RawTick};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use crate::provider::symbol::SymbolFn;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::SystemTime;

const DEFAULT_URL: &str = "https://api.kraken.com/0/public";

fn legacy_asset(code: &str) -> &str {
    match code.to_uppercase().as_str() {
        "BTC" => "XBT",
        "DOGE" => "XDG",
        other => return other,
    }
}

fn kraken_symbol(pair: &CurrencyPair) -> String {
    format!(
        "{}{}",
        legacy_asset(&pair.base).to_uppercase(),
        legacy_asset(&pair.quote).to_uppercase()
    )
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    result: HashMap<String, TickerEntry>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    /// Last trade closed array: `[price, lot volume]`.
    c: [String; 2],
    /// Volume array: `[today, last 24 hours]`.
    v: [String; 2],
}

pub struct Kraken {
    provider: Provider,
}

impl Kraken {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint {
            urls: vec![DEFAULT_URL.to_string()],
            ..Endpoint::default()
        });
        let provider = Provider::new("kraken", merged);
        let kraken = Kraken { provider };
        super::init_pairs(&kraken, requested).await;
        kraken
    }
}

#[async_trait]
impl CexPoll for Kraken {
    fn provider(&self) -> &Provider {
        &self.provider
    }

    fn symbol_fn(&self) -> SymbolFn {
        kraken_symbol
    }

    async fn fetch_ticks(&self) -> Result<Vec<RawTick>> {
        let tracked = self.provider.get_all_pairs().await;
        if tracked.is_empty() {
            return Ok(Vec::new());
        }
        let pair_list = tracked.keys().cloned().collect::<Vec<_>>().join(",");
        let response: TickerResponse = self
            .provider
            .http_get(&format!("Ticker?pair={pair_list}"))
            .await?;
        let now = SystemTime::now();
        Ok(response
            .result
            .into_iter()
            .filter(|(symbol, _)| tracked.contains_key(symbol))
            .map(|(symbol, entry)| {
                RawTick::new(
                    symbol,
                    Decimal::from_str_truncating(&entry.c[0]),
                    Decimal::from_str_truncating(&entry.v[1]),
                    now,
                )
            })
            .collect())
    }
}
