//! Uniswap-V3-style concentrated-liquidity pool provider (spec §4.2 step
//! 2-4, §8 scenario 6).
//!
//! Grounded on `dex/pool_listener/mod.rs`'s `fetch_v3_price`/`fetch_decimals`
//! (selector `slot0()`, `(sqrtPriceX96 / 2^96)^2`), rewired onto JSON-RPC
//! `eth_call` over HTTP the same way [`super::univ2`] rewires `getReserves`.

use crate::chain::RequestIdSource;
use crate::chain::evm::{
    self, AbiType, AbiValue, eth_call_request, eth_get_logs_request, event_topic,
    parse_eth_call_response, parse_eth_get_logs_response, selector,
};
use crate::decimal::Decimal;
use crate::endpoint::Endpoint;
use crate::error::{ProviderError, Result};
use crate::pair::CurrencyPair;
use crate::provider::symbol::canonical;
use crate::provider::{Provider, ProviderHandle};
use crate::scheduler::Poll;
use crate::ticker::TickerPrice;
use crate::volume::{VolumeBucket, VolumeHandler};
use async_trait::async_trait;
use ethers::core::types::U256;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use tokio::sync::RwLock;

/// `Swap(address,address,int256,int256,uint160,uint128,int24)`.
const SWAP_EVENT: &str = "Swap(address,address,int256,int256,uint160,uint128,int24)";
const WINDOW_BLOCKS: u64 = 7200;

/// `(sqrtPriceX96 / 2^96)^2`, spec §8 scenario 6. `sqrtPriceX96` can exceed
/// `U256`'s useful exact-arithmetic range once squared, so — same as the
/// teacher — this one conversion goes through `f64`; decimals normalization
/// downstream stays exact `Decimal` arithmetic.
fn sqrt_price_ratio(sqrt_price_x96: &U256) -> f64 {
    let sqrt_f: f64 = sqrt_price_x96.to_string().parse().unwrap_or(0.0);
    let q96 = 2f64.powi(96);
    (sqrt_f / q96).powi(2)
}

pub struct Univ3 {
    provider: Provider,
    volume: VolumeHandler,
    ids: RequestIdSource,
    decimals: RwLock<HashMap<String, (u8, u8)>>,
}

impl Univ3 {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint::default());
        let available: HashSet<String> = merged.contract_addresses.keys().cloned().collect();
        let provider = Provider::new("univ3", merged);
        provider.set_pairs(requested, &available, canonical).await;

        let symbols = provider.get_all_pairs().await.keys().cloned().collect::<Vec<_>>();
        Univ3 {
            provider,
            volume: VolumeHandler::new(WINDOW_BLOCKS, symbols),
            ids: RequestIdSource::default(),
            decimals: RwLock::new(HashMap::new()),
        }
    }

    async fn eth_call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        let request = eth_call_request(self.ids.next(), to, &data, "latest");
        let response: Value = self.provider.http_post("", &request).await?;
        parse_eth_call_response(&response)
    }

    async fn latest_block_number(&self) -> Result<u64> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.ids.next(),
            "method": "eth_blockNumber",
            "params": [],
        });
        let response: Value = self.provider.http_post("", &request).await?;
        let hex = response
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Decode("eth_blockNumber missing result".into()))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| ProviderError::Decode(format!("invalid block number: {e}")))
    }

    async fn token_decimals(&self, token: &str) -> Result<u8> {
        let data = self.eth_call(token, selector("decimals()").to_vec()).await?;
        let decoded = evm::decode(&data, &[AbiType::Uint])?;
        match decoded.into_iter().next() {
            Some(AbiValue::Uint(u)) => Ok(u.as_u32() as u8),
            _ => Err(ProviderError::Decode("decimals() returned no value".into())),
        }
    }

    async fn pool_decimals(&self, pool: &str) -> Result<(u8, u8)> {
        if let Some(cached) = self.decimals.read().await.get(pool) {
            return Ok(*cached);
        }
        let token0 = evm::decode(
            &self.eth_call(pool, selector("token0()").to_vec()).await?,
            &[AbiType::Address],
        )?;
        let token1 = evm::decode(
            &self.eth_call(pool, selector("token1()").to_vec()).await?,
            &[AbiType::Address],
        )?;
        let (AbiValue::Address(t0), AbiValue::Address(t1)) = (&token0[0], &token1[0]) else {
            return Err(ProviderError::Decode("token0/token1 returned no address".into()));
        };
        let t0_hex = format!("0x{}", crate::chain::hex_encode(t0.as_bytes()));
        let t1_hex = format!("0x{}", crate::chain::hex_encode(t1.as_bytes()));
        let d0 = self.token_decimals(&t0_hex).await?;
        let d1 = self.token_decimals(&t1_hex).await?;
        self.decimals.write().await.insert(pool.to_string(), (d0, d1));
        Ok((d0, d1))
    }

    async fn pool_price(&self, pool: &str, d0: u8, d1: u8) -> Result<Decimal> {
        let data = self.eth_call(pool, selector("slot0()").to_vec()).await?;
        if data.len() < 32 {
            return Err(ProviderError::Decode("slot0() response too short".into()));
        }
        let decoded = evm::decode(&data[..32], &[AbiType::Uint])?;
        let AbiValue::Uint(sqrt_price_x96) = &decoded[0] else {
            return Err(ProviderError::Decode("slot0() returned no value".into()));
        };
        let raw_ratio = sqrt_price_ratio(sqrt_price_x96);
        let factor = super::pow10(d0 as i32 - d1 as i32);
        Ok(Decimal::from_f64(raw_ratio).checked_mul(&factor))
    }

    async fn fill_volume(&self, symbol: &str, pool: &str, d0: u8) -> Result<()> {
        let tip = self.latest_block_number().await?;
        self.volume.observe_tip(symbol, tip);
        let missing = self.volume.missing(symbol, 50_000);
        let ranges = super::group_ranges(missing, self.provider.endpoint.volume_blocks);
        let topic0 = event_topic(SWAP_EVENT);

        for (from, to) in ranges {
            let request = eth_get_logs_request(self.ids.next(), from, to, &[pool.to_string()], &[Some(topic0.clone())]);
            let response: Value = self.provider.http_post("", &request).await?;
            let logs = parse_eth_get_logs_response(&response)?;

            let mut by_block: HashMap<u64, Decimal> = HashMap::new();
            for log in &logs {
                if log.data.len() < 160 {
                    continue;
                }
                let values = evm::decode(
                    &log.data,
                    &[AbiType::Int, AbiType::Int, AbiType::Uint, AbiType::Uint, AbiType::Int],
                )?;
                let AbiValue::Int(amount0) = &values[0] else {
                    continue;
                };
                let raw = Decimal::from_str_truncating(&amount0.unsigned_abs().to_string());
                let normalized = raw.checked_mul(&super::pow10(-(d0 as i32)));
                let entry = by_block.entry(log.block_number).or_insert(Decimal::ZERO);
                *entry = entry.checked_add(&normalized);
            }
            let buckets: Vec<VolumeBucket> = (from..=to)
                .map(|id| VolumeBucket::new(id, by_block.get(&id).copied().unwrap_or(Decimal::ZERO)))
                .collect();
            self.volume.add(symbol, &buckets);

            if !self.provider.endpoint.volume_pause.is_zero() {
                tokio::time::sleep(self.provider.endpoint.volume_pause).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Poll for Univ3 {
    async fn poll(&self) -> Result<()> {
        let pairs = self.provider.get_all_pairs().await;
        for (symbol, _pair) in pairs {
            let Some(pool) = self.provider.contract_for_symbol(&symbol).await else {
                continue;
            };
            let (d0, d1) = match self.pool_decimals(&pool).await {
                Ok(d) => d,
                Err(err) => {
                    log::warn!("univ3: decimals for {symbol} failed: {err}");
                    continue;
                }
            };
            let price = match self.pool_price(&pool, d0, d1).await {
                Ok(p) => p,
                Err(err) => {
                    log::warn!("univ3: price for {symbol} failed: {err}");
                    continue;
                }
            };
            if let Err(err) = self.fill_volume(&symbol, &pool, d0).await {
                log::warn!("univ3: volume for {symbol} failed: {err}");
            }
            let (volume, complete) = self.volume.get(&symbol);
            if !complete {
                log::debug!("univ3: {symbol} volume window not yet fully filled");
            }
            self.provider
                .set_ticker_price(&symbol, price, volume, SystemTime::now())
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderHandle for Univ3 {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn get_ticker_prices(&self, pairs: &[CurrencyPair]) -> HashMap<String, TickerPrice> {
        self.provider.get_ticker_prices(pairs).await
    }

    async fn subscribe_currency_pairs(&self, pairs: Vec<CurrencyPair>) -> Result<()> {
        let available: HashSet<String> = self.provider.endpoint.contract_addresses.keys().cloned().collect();
        self.provider.subscribe_pairs(&pairs, &available, canonical).await;
        Ok(())
    }

    async fn get_available_pairs(&self) -> Result<HashSet<String>> {
        Ok(self.provider.endpoint.contract_addresses.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_price_ratio_of_one_at_2_pow_96() {
        let sqrt_price_x96 = U256::from(2u64).pow(U256::from(96u64));
        let ratio = sqrt_price_ratio(&sqrt_price_x96);
        assert!((ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scenario_six_price_decode() {
        // spec §8 scenario 6: sqrtPriceX96 = 2^96, decimalsBase=18,
        // decimalsQuote=6 -> normalized price = 1e12.
        let sqrt_price_x96 = U256::from(2u64).pow(U256::from(96u64));
        let ratio = sqrt_price_ratio(&sqrt_price_x96);
        let factor = super::super::pow10(18 - 6);
        let price = Decimal::from_f64(ratio).checked_mul(&factor);
        let expected = Decimal::from_str_truncating("1000000000000");
        assert_eq!(price, expected);
    }
}
