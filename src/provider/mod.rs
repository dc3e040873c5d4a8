//! Provider Runtime (base) — spec §4.1.
//!
//! Shared state and helpers every concrete provider embeds by composition
//! (Rust has no struct inheritance; the teacher's `create_exchange!` macro
//! is the closest analogue — every concrete provider here holds a
//! `Provider` field instead of a bare `reqwest::Client`).

pub mod symbol;

use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::{ProviderError, Result};
use crate::pair::CurrencyPair;
use crate::ticker::{DEFAULT_STALE_CUTOFF, TickerPrice};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use symbol::{SymbolFn, canonical};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// The common contract the outer oracle layer consumes through: dynamic
/// dispatch over every concrete provider (spec §6, §9).
#[async_trait]
pub trait ProviderHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Returns only fresh entries (spec §6). Missing or stale pairs are
    /// omitted, never surfaced as an error.
    async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice>;

    /// Dynamically extends the pair set. For streaming providers this also
    /// delivers an incremental subscribe message to the live connection.
    async fn subscribe_currency_pairs(&self, pairs: Vec<CurrencyPair>) -> Result<()>;

    /// Default: no listing endpoint. Concrete providers override when one
    /// exists (spec §4.1).
    async fn get_available_pairs(&self) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }
}

#[derive(Default)]
struct ProviderState {
    /// Keyed by the canonical symbol of the pair as requested; value is
    /// that same pair in its native (source-supported) orientation.
    pairs: HashMap<String, CurrencyPair>,
    /// Keyed by the canonical symbol of the *swapped* pair (the orientation
    /// actually available at the source); value is the original
    /// (non-swapped) requested pair.
    inverse: HashMap<String, CurrencyPair>,
    /// Keyed by the canonical symbol of the *requested* pair (spec
    /// invariant 2 reasons about this key space — see
    /// [`Provider::set_ticker_price`] for how inverse entries land here).
    tickers: HashMap<String, TickerPrice>,
    contracts: HashMap<String, String>,
    contracts_rev: HashMap<String, String>,
    height: u64,
}

/// Shared state and helpers every concrete provider composes.
pub struct Provider {
    name: String,
    pub endpoint: Endpoint,
    client: reqwest::Client,
    url_cursor: AtomicUsize,
    state: RwLock<ProviderState>,
    pub cancellation: CancellationToken,
}

impl Provider {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build HTTP client");

        let start = if endpoint.urls.is_empty() {
            0
        } else {
            rand::random::<usize>() % endpoint.urls.len()
        };

        let mut state = ProviderState::default();
        for (symbol, address) in &endpoint.contract_addresses {
            state.contracts.insert(symbol.clone(), address.clone());
            state.contracts_rev.insert(address.clone(), symbol.clone());
        }

        Provider {
            name: name.into(),
            endpoint,
            client,
            url_cursor: AtomicUsize::new(start),
            state: RwLock::new(state),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn contract_for_symbol(&self, symbol: &str) -> Option<String> {
        self.state.read().await.contracts.get(symbol).cloned()
    }

    pub async fn symbol_for_contract(&self, address: &str) -> Option<String> {
        self.state.read().await.contracts_rev.get(address).cloned()
    }

    pub async fn height(&self) -> u64 {
        self.state.read().await.height
    }

    pub async fn set_height(&self, height: u64) {
        self.state.write().await.height = height;
    }

    /// The pair-orientation decision (spec §4.1): for each requested pair,
    /// if `symbol_fn(pair)` is available natively, record it in `pairs`;
    /// else if the swapped orientation is available, record it in
    /// `inverse`; else drop it with a warning. This is the sole source of
    /// invariant 1 (`pairs ∩ inverse = ∅`).
    pub async fn set_pairs(
        &self,
        requested: &[CurrencyPair],
        available: &HashSet<String>,
        symbol_fn: SymbolFn,
    ) {
        let mut state = self.state.write().await;
        for pair in requested {
            let native_key = symbol_fn(pair);
            if available.is_empty() || available.contains(&native_key) {
                state.pairs.insert(native_key, pair.clone());
                continue;
            }
            let swapped = pair.swap();
            let swapped_key = symbol_fn(&swapped);
            if available.contains(&swapped_key) {
                state.inverse.insert(swapped_key, pair.clone());
            } else {
                log::warn!(
                    "{}: pair {} not available at source, dropping",
                    self.name,
                    pair
                );
            }
        }
    }

    /// spec §6 `SubscribeCurrencyPairs`: extends the pair set via the same
    /// orientation logic `set_pairs` uses.
    pub async fn subscribe_pairs(
        &self,
        new_pairs: &[CurrencyPair],
        available: &HashSet<String>,
        symbol_fn: SymbolFn,
    ) {
        self.set_pairs(new_pairs, available, symbol_fn).await;
    }

    pub async fn is_pair(&self, source_symbol: &str) -> bool {
        let state = self.state.read().await;
        state.pairs.contains_key(source_symbol) || state.inverse.contains_key(source_symbol)
    }

    /// Merged `pairs ∪ inverse`, keyed by source-native symbol.
    pub async fn get_all_pairs(&self) -> HashMap<String, CurrencyPair> {
        let state = self.state.read().await;
        let mut all = HashMap::with_capacity(state.pairs.len() + state.inverse.len());
        all.extend(state.pairs.iter().map(|(k, v)| (k.clone(), v.clone())));
        all.extend(state.inverse.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    /// The only write path for prices (spec §4.1). `source_symbol` is the
    /// symbol the concrete provider resolved the observation against —
    /// either a direct entry in `pairs`, or (for inverted pairs) an entry
    /// in `inverse` keyed by the swapped orientation.
    ///
    /// A non-positive price is a semantic error (spec §7): dropped with a
    /// warning rather than written, preserving invariant 2.
    pub async fn set_ticker_price(
        &self,
        source_symbol: &str,
        price: Decimal,
        volume: Decimal,
        time: SystemTime,
    ) {
        let mut state = self.state.write().await;
        if let Some(pair) = state.inverse.get(source_symbol).cloned() {
            if !price.is_positive() {
                log::warn!(
                    "{}: non-positive price for inverse pair {}, dropping",
                    self.name,
                    source_symbol
                );
                return;
            }
            let key = pair.canonical();
            let inverted_price = price.inverse();
            let adjusted_volume = volume.checked_mul(&price);
            state
                .tickers
                .insert(key, TickerPrice::new(inverted_price, adjusted_volume, time));
        } else if state.pairs.contains_key(source_symbol) {
            if !price.is_positive() {
                log::warn!(
                    "{}: non-positive price for {}, dropping",
                    self.name,
                    source_symbol
                );
                return;
            }
            state
                .tickers
                .insert(source_symbol.to_string(), TickerPrice::new(price, volume, time));
        } else {
            log::debug!("{}: unknown symbol {}, skipping", self.name, source_symbol);
        }
    }

    /// Returns the subset of `tickers` whose `Time` is within
    /// `stale_cutoff` of now. Missing or stale pairs are omitted and logged
    /// (spec §4.1, §8).
    pub async fn get_ticker_prices_with_cutoff(
        &self,
        pairs: &[CurrencyPair],
        stale_cutoff: Duration,
    ) -> HashMap<String, TickerPrice> {
        let state = self.state.read().await;
        let now = SystemTime::now();
        let mut out = HashMap::with_capacity(pairs.len());
        for pair in pairs {
            let key = pair.canonical();
            match state.tickers.get(&key) {
                Some(tp) if !tp.is_stale(now, stale_cutoff) => {
                    out.insert(key, tp.clone());
                }
                Some(_) => {
                    log::warn!("{}: stale ticker for {}, omitting", self.name, key);
                }
                None => {
                    log::warn!("{}: no ticker for {}, omitting", self.name, key);
                }
            }
        }
        out
    }

    pub async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice> {
        self.get_ticker_prices_with_cutoff(pairs, DEFAULT_STALE_CUTOFF)
            .await
    }

    /// Picks the next URL from `Urls` (round-robin, jittered start),
    /// prefixes `path`. A 429/418 response is a soft failure: `Retry-After`
    /// is honored by sleeping before returning the error, so the caller's
    /// current tick still writes no tickers but the next tick proceeds
    /// normally (spec §4.1, §7, §8 scenario 5).
    pub async fn http_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.next_url(path)?;
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    pub async fn http_post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.next_url(path)?;
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    fn next_url(&self, path: &str) -> Result<String> {
        if self.endpoint.urls.is_empty() {
            return Err(ProviderError::Transport(format!(
                "{}: no configured URLs",
                self.name
            )));
        }
        let idx = self.url_cursor.fetch_add(1, Ordering::Relaxed) % self.endpoint.urls.len();
        let base = self.endpoint.urls[idx].trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(format!("{base}/{path}"))
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 || status.as_u16() == 418 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(1));
            log::warn!(
                "{}: rate limited, sleeping {:?}",
                self.name,
                retry_after
            );
            tokio::time::sleep(retry_after).await;
            return Err(ProviderError::RateLimited(retry_after));
        }

        // A redirect is treated as an error (client disables them, so any
        // 3xx response means the client rejected one).
        if status.is_redirection() {
            return Err(ProviderError::Transport(format!(
                "{}: unexpected redirect ({})",
                self.name, status
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!(
                "{}: {} - {}",
                self.name, status, body
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

pub type SharedProvider = Arc<Provider>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;

    fn test_provider() -> Provider {
        Provider::new("test", Endpoint::default())
    }

    #[tokio::test]
    async fn direct_pair_goes_into_pairs() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("ATOM", "USDT")];
        let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        assert!(p.is_pair("ATOMUSDT").await);
    }

    #[tokio::test]
    async fn inverse_pair_goes_into_inverse() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("USDC", "USK")];
        let available: HashSet<String> = ["USKUSDC".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        assert!(p.is_pair("USKUSDC").await);
    }

    #[tokio::test]
    async fn unavailable_pair_is_dropped() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("FOO", "BAR")];
        let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        assert!(!p.is_pair("FOOBAR").await);
        assert!(!p.is_pair("BARFOO").await);
    }

    #[tokio::test]
    async fn direct_pair_scenario() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("ATOM", "USDT")];
        let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        p.set_ticker_price(
            "ATOMUSDT",
            Decimal::from_str_truncating("12.3456"),
            Decimal::from_str_truncating("7654321.98765"),
            SystemTime::now(),
        )
        .await;
        let prices = p.get_ticker_prices(&requested).await;
        let tp = prices.get("ATOMUSDT").unwrap();
        assert_eq!(tp.price, Decimal::from_str_truncating("12.3456"));
        assert_eq!(tp.volume, Decimal::from_str_truncating("7654321.98765"));
    }

    #[tokio::test]
    async fn inverse_pair_scenario() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("USDC", "USK")];
        let available: HashSet<String> = ["USKUSDC".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        p.set_ticker_price(
            "USKUSDC",
            Decimal::from_str_truncating("1.0320"),
            Decimal::from_str_truncating("100"),
            SystemTime::now(),
        )
        .await;
        let prices = p.get_ticker_prices(&requested).await;
        let tp = prices.get("USDCUSK").unwrap();
        let expected_price = 1.0 / 1.0320;
        assert!((tp.price.to_f64().unwrap() - expected_price).abs() < 1e-12);
        assert!((tp.volume.to_f64().unwrap() - 103.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_ticker_is_omitted() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("ATOM", "USDT")];
        let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
        p.set_pairs(&requested, &available, canonical).await;
        let old_time = SystemTime::now() - Duration::from_secs(90);
        p.set_ticker_price(
            "ATOMUSDT",
            Decimal::from_str_truncating("12.3456"),
            Decimal::from_str_truncating("1"),
            old_time,
        )
        .await;
        let prices = p.get_ticker_prices(&requested).await;
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn unknown_pair_returns_empty_without_panic() {
        let p = test_provider();
        let requested = vec![CurrencyPair::new("FOO", "BAR")];
        let prices = p.get_ticker_prices(&requested).await;
        assert!(prices.is_empty());
    }
}
