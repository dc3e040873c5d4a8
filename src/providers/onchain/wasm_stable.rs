//! CosmWasm stableswap pool provider (spec §4.2 step 2-4, §4.6 Cosmos REST
//! helpers). No direct teacher analogue (the teacher repo is EVM-only); the
//! REST query/tx shapes are grounded on `chain::cosmwasm`'s path builders
//! and response parsers, following the same resolve-pool / cache-decimals /
//! read-price / fill-volume algorithm as [`super::univ2`] and
//! [`super::univ3`] but over CosmWasm smart queries and Cosmos tx events
//! instead of `eth_call`/`eth_getLogs`.

use crate::chain::cosmwasm::{
    self, cosmos_txs_at_path, decode_wasm_smart_response, wasm_smart_query_path,
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
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;
use tokio::sync::RwLock;

/// Average Cosmos SDK chain block time is ~6s; 24h of blocks.
const WINDOW_BLOCKS: u64 = 14_400;
const SWAP_ACTION: &str = "swap";

#[derive(Debug, Deserialize)]
struct PoolAsset {
    amount: String,
}

#[derive(Debug, Deserialize)]
struct PoolResponse {
    assets: Vec<PoolAsset>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    decimals: u8,
}

pub struct WasmStable {
    provider: Provider,
    volume: VolumeHandler,
    decimals: RwLock<HashMap<String, (u8, u8)>>,
}

impl WasmStable {
    pub async fn new(endpoint: Endpoint, requested: &[CurrencyPair]) -> Self {
        let merged = endpoint.merge_defaults(&Endpoint::default());
        let available: HashSet<String> = merged.contract_addresses.keys().cloned().collect();
        let provider = Provider::new("wasm_stable", merged);
        provider.set_pairs(requested, &available, canonical).await;

        let symbols = provider.get_all_pairs().await.keys().cloned().collect::<Vec<_>>();
        WasmStable {
            provider,
            volume: VolumeHandler::new(WINDOW_BLOCKS, symbols),
            decimals: RwLock::new(HashMap::new()),
        }
    }

    async fn smart_query(&self, contract: &str, msg: &Value) -> Result<Value> {
        let path = wasm_smart_query_path(contract, msg);
        let response: Value = self.provider.http_get(&path).await?;
        decode_wasm_smart_response(&response)
    }

    async fn pool_decimals(&self, pool: &str) -> Result<(u8, u8)> {
        if let Some(cached) = self.decimals.read().await.get(pool) {
            return Ok(*cached);
        }
        let pair_info = self.smart_query(pool, &json!({"pair": {}})).await?;
        let asset_infos = pair_info
            .get("asset_infos")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::Decode("pair query missing asset_infos".into()))?;
        if asset_infos.len() != 2 {
            return Err(ProviderError::Decode("pair query expected two assets".into()));
        }
        let mut decimals = [0u8; 2];
        for (i, info) in asset_infos.iter().enumerate() {
            decimals[i] = self.token_decimals(info).await?;
        }
        let pair = (decimals[0], decimals[1]);
        self.decimals.write().await.insert(pool.to_string(), pair);
        Ok(pair)
    }

    async fn token_decimals(&self, asset_info: &Value) -> Result<u8> {
        if asset_info.get("native_token").and_then(|n| n.get("denom")).is_some() {
            // Native denoms (e.g. `uosmo`) are always 6-decimal in the
            // Cosmos SDK convention this pool family follows.
            return Ok(6);
        }
        let contract_addr = asset_info
            .get("token")
            .and_then(|t| t.get("contract_addr"))
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Decode("asset_info missing contract_addr".into()))?;
        let info: TokenInfoResponse =
            serde_json::from_value(self.smart_query(contract_addr, &json!({"token_info": {}})).await?)
                .map_err(ProviderError::Json)?;
        Ok(info.decimals)
    }

    async fn pool_price(&self, pool: &str, d0: u8, d1: u8) -> Result<Decimal> {
        let response = self.smart_query(pool, &json!({"pool": {}})).await?;
        let pool_state: PoolResponse = serde_json::from_value(response).map_err(ProviderError::Json)?;
        if pool_state.assets.len() != 2 {
            return Err(ProviderError::Decode("pool query expected two assets".into()));
        }
        let r0 = Decimal::from_str_truncating(&pool_state.assets[0].amount);
        let r1 = Decimal::from_str_truncating(&pool_state.assets[1].amount);
        if !r0.is_positive() {
            return Err(ProviderError::Semantic("zero or negative reserve0".into()));
        }
        let factor = super::pow10(d0 as i32 - d1 as i32);
        Ok(r1.checked_div(&r0).checked_mul(&factor))
    }

    async fn latest_height(&self) -> Result<u64> {
        let response: Value = self.provider.http_get("/cosmos/base/tendermint/v1beta1/blocks/latest").await?;
        response
            .get("block")
            .and_then(|b| b.get("header"))
            .and_then(|h| h.get("height"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| ProviderError::Decode("blocks/latest missing header.height".into()))
    }

    async fn fill_volume(&self, symbol: &str, pool: &str, d0: u8) -> Result<()> {
        let tip = self.latest_height().await?;
        self.volume.observe_tip(symbol, tip);
        let missing = self.volume.missing(symbol, 200);

        for height in missing {
            let path = cosmos_txs_at_path(height, &[]);
            let response: Value = self.provider.http_get(&path).await?;
            let txs = cosmwasm::parse_cosmos_txs(&response)?;

            let mut amount = Decimal::ZERO;
            for tx in &txs {
                for event in tx.events_by_type("wasm") {
                    let Some(contract) = event.attributes.get("_contract_address") else {
                        continue;
                    };
                    if contract.as_str() != pool {
                        continue;
                    }
                    let Some(action) = event.attributes.get("action") else {
                        continue;
                    };
                    if action.as_str() != SWAP_ACTION {
                        continue;
                    }
                    if let Some(offer) = event.attributes.get("offer_amount") {
                        let raw = Decimal::from_str_truncating(offer);
                        amount = amount.checked_add(&raw.checked_mul(&super::pow10(-(d0 as i32))));
                    }
                }
            }
            self.volume.add(symbol, &[VolumeBucket::new(height, amount)]);

            if !self.provider.endpoint.volume_pause.is_zero() {
                tokio::time::sleep(self.provider.endpoint.volume_pause).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Poll for WasmStable {
    async fn poll(&self) -> Result<()> {
        let pairs = self.provider.get_all_pairs().await;
        for (symbol, _pair) in pairs {
            let Some(pool) = self.provider.contract_for_symbol(&symbol).await else {
                continue;
            };
            let (d0, d1) = match self.pool_decimals(&pool).await {
                Ok(d) => d,
                Err(err) => {
                    log::warn!("wasm_stable: decimals for {symbol} failed: {err}");
                    continue;
                }
            };
            let price = match self.pool_price(&pool, d0, d1).await {
                Ok(p) => p,
                Err(err) => {
                    log::warn!("wasm_stable: price for {symbol} failed: {err}");
                    continue;
                }
            };
            if let Err(err) = self.fill_volume(&symbol, &pool, d0).await {
                log::warn!("wasm_stable: volume for {symbol} failed: {err}");
            }
            let (volume, complete) = self.volume.get(&symbol);
            if !complete {
                log::debug!("wasm_stable: {symbol} volume window not yet fully filled");
            }
            self.provider
                .set_ticker_price(&symbol, price, volume, SystemTime::now())
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderHandle for WasmStable {
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
