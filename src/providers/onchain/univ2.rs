//! Uniswap-V2-style constant-product pool provider (spec §4.2 step 2-4).
//!
//! Grounded on `dex/pool_listener/mod.rs`'s `fetch_v2_price`/`fetch_decimals`
//! (selectors `getReserves()`/`token0()`/`token1()`/`decimals()`), rewired
//! from a live `ethers::providers::Ws` connection onto JSON-RPC `eth_call`
//! over HTTP via [`Provider::http_post`] and [`crate::chain::evm`].

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
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use tokio::sync::RwLock;

/// `Swap(address,uint256,uint256,uint256,uint256,address)`.
const SWAP_EVENT: &str = "Swap(address,uint256,uint256,uint256,uint256,address)";
/// 24h of Ethereum mainnet blocks at ~12s/block.
const WINDOW_BLOCKS: u64 = 7200;

pub struct Univ2 {
    provider: Provider,
    volume: VolumeHandler,
    ids: RequestIdSource,
    decimals: RwLock<HashMap<String, (u8, u8)>>,
}

impl Univ2 {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint::default());
        let available: HashSet<String> = merged.contract_addresses.keys().cloned().collect();
        let provider = Provider::new("univ2", merged);
        provider.set_pairs(requested, &available, canonical).await;

        let symbols = provider.get_all_pairs().await.keys().cloned().collect::<Vec<_>>();
        Univ2 {
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
        let data = self.eth_call(pool, selector("getReserves()").to_vec()).await?;
        if data.len() < 64 {
            return Err(ProviderError::Decode("getReserves() response too short".into()));
        }
        let decoded = evm::decode(&data[..64], &[AbiType::Uint, AbiType::Uint])?;
        let (AbiValue::Uint(r0), AbiValue::Uint(r1)) = (&decoded[0], &decoded[1]) else {
            return Err(ProviderError::Decode("getReserves() returned no value".into()));
        };
        if r0.is_zero() {
            return Err(ProviderError::Semantic("zero reserve0".into()));
        }
        let r0 = Decimal::from_str_truncating(&r0.to_string());
        let r1 = Decimal::from_str_truncating(&r1.to_string());
        let factor = super::pow10(d0 as i32 - d1 as i32);
        Ok(r1.checked_div(&r0).checked_mul(&factor))
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
                if log.data.len() < 128 {
                    continue;
                }
                let values = evm::decode(
                    &log.data,
                    &[AbiType::Uint, AbiType::Uint, AbiType::Uint, AbiType::Uint],
                )?;
                let (AbiValue::Uint(in0), AbiValue::Uint(out0)) = (&values[0], &values[2]) else {
                    continue;
                };
                let raw = Decimal::from_str_truncating(&in0.to_string())
                    .checked_add(&Decimal::from_str_truncating(&out0.to_string()));
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
impl Poll for Univ2 {
    async fn poll(&self) -> Result<()> {
        let pairs = self.provider.get_all_pairs().await;
        for (symbol, _pair) in pairs {
            let Some(pool) = self.provider.contract_for_symbol(&symbol).await else {
                continue;
            };
            let (d0, d1) = match self.pool_decimals(&pool).await {
                Ok(d) => d,
                Err(err) => {
                    log::warn!("univ2: decimals for {symbol} failed: {err}");
                    continue;
                }
            };
            let price = match self.pool_price(&pool, d0, d1).await {
                Ok(p) => p,
                Err(err) => {
                    log::warn!("univ2: price for {symbol} failed: {err}");
                    continue;
                }
            };
            if let Err(err) = self.fill_volume(&symbol, &pool, d0).await {
                log::warn!("univ2: volume for {symbol} failed: {err}");
            }
            let (volume, complete) = self.volume.get(&symbol);
            if !complete {
                log::debug!("univ2: {symbol} volume window not yet fully filled");
            }
            self.provider
                .set_ticker_price(&symbol, price, volume, SystemTime::now())
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderHandle for Univ2 {
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
