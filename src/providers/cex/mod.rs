//! CEX concrete providers (spec §4.2).
//!
//! Each provider embeds a single [`Provider`] field — the same shape as the
//! teacher's `create_exchange!`-generated structs (`common/exchange.rs`),
//! generalized from a bare `reqwest::Client` to the shared runtime base.
//! Three sources (Binance, OKX, Bybit) stream over [`crate::ws`]; the rest
//! poll over [`CexPoll`], which the blanket impls below wire into
//! [`crate::scheduler::Poll`] and [`ProviderHandle`] so only the REST shape
//! and response parsing differ per source.

pub mod binance;
pub mod bitfinex;
pub mod bitget;
pub mod btcturk;
pub mod bybit;
pub mod coinbase;
pub mod cryptocom;
pub mod gateio;
pub mod htx;
pub mod kraken;
pub mod kucoin;
pub mod mexc;
pub mod okx;
pub mod upbit;

use crate::decimal::Decimal;
use crate::error::Result;
use crate::pair::CurrencyPair;
use crate::provider::Provider;
use crate::provider::ProviderHandle;
use crate::provider::symbol::{SymbolFn, canonical};
use crate::scheduler::Poll;
use crate::ticker::TickerPrice;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

/// One parsed ticker observation, ready for [`Provider::set_ticker_price`].
pub struct RawTick {
    pub source_symbol: String,
    pub price: Decimal,
    pub volume: Decimal,
    pub time: SystemTime,
}

impl RawTick {
    pub fn new(source_symbol: impl Into<String>, price: Decimal, volume: Decimal, time: SystemTime) -> Self {
        RawTick {
            source_symbol: source_symbol.into(),
            price,
            volume,
            time,
        }
    }
}

/// Implemented once per polling CEX provider. The only per-source code is
/// the REST shape and response parsing; [`Poll`] and [`ProviderHandle`] are
/// derived below via blanket impls.
#[async_trait]
pub trait CexPoll: Send + Sync {
    fn provider(&self) -> &Provider;

    fn symbol_fn(&self) -> SymbolFn {
        canonical
    }

    /// Fetches and parses the current tick(s) for subscribed pairs —
    /// bulk-endpoint sources fetch everything and filter locally; per-symbol
    /// sources loop over `provider().get_all_pairs()` themselves.
    async fn fetch_ticks(&self) -> Result<Vec<RawTick>>;

    /// Source instrument listing (spec §4.1's "optionally discovers the set
    /// of available pairs"). Default: no listing endpoint, so every native
    /// symbol is accepted unconditionally (`Provider::set_pairs`'s
    /// empty-available-set branch).
    async fn available_pairs(&self) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
}

#[async_trait]
impl<T: CexPoll> Poll for T {
    async fn poll(&self) -> Result<()> {
        let ticks = self.fetch_ticks().await?;
        for tick in ticks {
            self.provider()
                .set_ticker_price(&tick.source_symbol, tick.price, tick.volume, tick.time)
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: CexPoll> ProviderHandle for T {
    fn name(&self) -> &str {
        self.provider().name()
    }

    async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice> {
        self.provider().get_ticker_prices(pairs).await
    }

    async fn subscribe_currency_pairs(&self, pairs: Vec<CurrencyPair>) -> Result<()> {
        let available = self.available_pairs().await.unwrap_or_default();
        self.provider()
            .subscribe_pairs(&pairs, &available, self.symbol_fn())
            .await;
        Ok(())
    }

    async fn get_available_pairs(&self) -> Result<HashSet<String>> {
        self.available_pairs().await
    }
}

/// Initializes `provider`'s pair map against `requested`, using
/// `available_pairs` when the source exposes a listing endpoint. Called once
/// from each concrete provider's own `init`-style constructor helper.
pub async fn init_pairs<T: CexPoll>(cex: &T, requested: &[CurrencyPair]) {
    let available = cex.available_pairs().await.unwrap_or_default();
    cex.provider().set_pairs(requested, &available, cex.symbol_fn()).await;
}
