//! EVM JSON-RPC request/response helpers and the minimal ABI codec (spec
//! §4.6). Hand-written rather than pulled from `ethabi`'s full encoder (spec
//! §9's design note): these pools only ever call a handful of fixed-arity,
//! static-type functions (`getReserves`, `slot0`, `token0`, `token1`,
//! `decimals`), so a complete dynamic-type ABI implementation buys nothing.
//!
//! Big-integer words use [`ethers::types::U256`], already part of the
//! dependency stack (see `src/dex/pool_listener/mod.rs` in the teacher repo).

use super::{hex_decode, hex_encode};
use crate::error::{ProviderError, Result};
use ethers::core::types::{Address, U256};
use serde_json::{Value, json};

/// keccak256 of arbitrary bytes (first 4 bytes of `keccak256(signature)` are
/// the function selector; the full 32 bytes are an event topic).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    ethers::utils::keccak256(data)
}

/// The 4-byte function selector for a Solidity signature, e.g.
/// `"getReserves()"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// The 32-byte event topic for a Solidity event signature, e.g.
/// `"Swap(address,uint256,uint256,uint256,uint256,address)"`, as a
/// `0x`-prefixed hex string.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex_encode(&keccak256(signature.as_bytes())))
}

/// A static Solidity ABI value this codec can encode/decode.
#[derive(Debug, Clone, PartialEq)]
pub enum AbiValue {
    /// `uint8`..`uint256`.
    Uint(U256),
    /// `int24`..`int256`, represented as `i128` — sufficient for realistic
    /// pool reserves and swap deltas; values outside `i128` range are
    /// rejected by [`decode`] rather than silently truncated.
    Int(i128),
    Address(Address),
    Bool(bool),
}

impl AbiValue {
    fn encode_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        match self {
            AbiValue::Uint(u) => u.to_big_endian(&mut word),
            AbiValue::Int(i) => {
                let word_u256 = if *i >= 0 {
                    U256::from(*i as u128)
                } else {
                    // Two's complement: 2^256 - |i|.
                    U256::MAX - U256::from((-*i) as u128) + U256::one()
                };
                word_u256.to_big_endian(&mut word);
            }
            AbiValue::Address(addr) => {
                word[12..32].copy_from_slice(addr.as_bytes());
            }
            AbiValue::Bool(b) => {
                word[31] = if *b { 1 } else { 0 };
            }
        }
        word
    }
}

/// The static Solidity type of one decoded slot, used to drive [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Uint,
    Int,
    Address,
    Bool,
}

/// Encodes a full `eth_call` data payload: selector followed by the
/// 32-byte-word encoding of each static argument.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.encode_word());
    }
    data
}

/// Decodes a sequence of fixed-width, static ABI values from call-return
/// `data`, one 32-byte word per entry in `types`.
pub fn decode(data: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>> {
    if data.len() < types.len() * 32 {
        return Err(ProviderError::Decode(format!(
            "abi decode: expected at least {} bytes for {} word(s), got {}",
            types.len() * 32,
            types.len(),
            data.len()
        )));
    }
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let word = &data[i * 32..(i + 1) * 32];
            match ty {
                AbiType::Uint => Ok(AbiValue::Uint(U256::from_big_endian(word))),
                AbiType::Address => Ok(AbiValue::Address(Address::from_slice(&word[12..32]))),
                AbiType::Bool => Ok(AbiValue::Bool(word[31] != 0)),
                AbiType::Int => {
                    let u = U256::from_big_endian(word);
                    let negative = word[0] & 0x80 != 0;
                    let value = if negative {
                        let magnitude = (U256::MAX - u) + U256::one();
                        if magnitude > U256::from(i128::MAX as u128) {
                            return Err(ProviderError::Decode(
                                "abi decode: int256 value out of i128 range".into(),
                            ));
                        }
                        -(magnitude.as_u128() as i128)
                    } else {
                        if u > U256::from(i128::MAX as u128) {
                            return Err(ProviderError::Decode(
                                "abi decode: int256 value out of i128 range".into(),
                            ));
                        }
                        u.as_u128() as i128
                    };
                    Ok(AbiValue::Int(value))
                }
            }
        })
        .collect()
}

/// `eth_call` JSON-RPC request builder.
pub fn eth_call_request(id: u64, to: &str, data: &[u8], block: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_call",
        "params": [{"to": to, "data": format!("0x{}", hex_encode(data))}, block],
    })
}

/// `eth_getLogs` JSON-RPC request builder.
pub fn eth_get_logs_request(
    id: u64,
    from_block: u64,
    to_block: u64,
    addresses: &[String],
    topics: &[Option<String>],
) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_getLogs",
        "params": [{
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
            "address": addresses,
            "topics": topics,
        }],
    })
}

/// `eth_getBlockByNumber` JSON-RPC request builder.
pub fn eth_get_block_by_number_request(id: u64, height: u64, full_transactions: bool) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_getBlockByNumber",
        "params": [format!("0x{height:x}"), full_transactions],
    })
}

/// One decoded EVM log entry.
#[derive(Debug, Clone)]
pub struct EthLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: Vec<u8>,
    pub block_number: u64,
}

fn rpc_error(response: &Value) -> Option<ProviderError> {
    response
        .get("error")
        .map(|e| ProviderError::Rpc(e.to_string()))
}

/// Extracts the `result` hex string of an `eth_call` response into raw
/// bytes, propagating a JSON-RPC `error` field as a failure.
pub fn parse_eth_call_response(response: &Value) -> Result<Vec<u8>> {
    if let Some(err) = rpc_error(response) {
        return Err(err);
    }
    let result = response
        .get("result")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Decode("eth_call response missing result".into()))?;
    hex_decode(result)
}

/// Extracts the `result` array of an `eth_getLogs` response.
pub fn parse_eth_get_logs_response(response: &Value) -> Result<Vec<EthLog>> {
    if let Some(err) = rpc_error(response) {
        return Err(err);
    }
    let entries = response
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Decode("eth_getLogs response missing result".into()))?;

    entries
        .iter()
        .map(|entry| {
            let address = entry
                .get("address")
                .and_then(Value::as_str)
                .ok_or_else(|| ProviderError::Decode("log entry missing address".into()))?
                .to_string();
            let topics = entry
                .get("topics")
                .and_then(Value::as_array)
                .ok_or_else(|| ProviderError::Decode("log entry missing topics".into()))?
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            let data_hex = entry.get("data").and_then(Value::as_str).unwrap_or("0x");
            let data = hex_decode(data_hex)?;
            let block_number = entry
                .get("blockNumber")
                .and_then(Value::as_str)
                .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
                .ok_or_else(|| ProviderError::Decode("log entry missing blockNumber".into()))?;
            Ok(EthLog {
                address,
                topics,
                data,
                block_number,
            })
        })
        .collect()
}

/// Extracts the block timestamp (seconds since epoch) from an
/// `eth_getBlockByNumber` response.
pub fn parse_eth_block_timestamp(response: &Value) -> Result<u64> {
    if let Some(err) = rpc_error(response) {
        return Err(err);
    }
    let timestamp_hex = response
        .get("result")
        .and_then(|r| r.get("timestamp"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Decode("block response missing timestamp".into()))?;
    u64::from_str_radix(timestamp_hex.trim_start_matches("0x"), 16)
        .map_err(|e| ProviderError::Decode(format!("invalid block timestamp: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_get_reserves() {
        // keccak256("getReserves()")[..4] == 0x0902f1ac, the well-known
        // Uniswap V2 pair selector (also hard-coded in the teacher repo).
        assert_eq!(selector("getReserves()"), [0x09, 0x02, 0xf1, 0xac]);
    }

    #[test]
    fn encode_decode_round_trip_uint_and_address() {
        let addr = Address::from_low_u64_be(0xdeadbeef);
        let encoded = encode_call(
            "transfer(address,uint256)",
            &[AbiValue::Address(addr), AbiValue::Uint(U256::from(1_000_000u64))],
        );
        assert_eq!(&encoded[0..4], &selector("transfer(address,uint256)"));
        let decoded = decode(&encoded[4..], &[AbiType::Address, AbiType::Uint]).unwrap();
        assert_eq!(decoded[0], AbiValue::Address(addr));
        assert_eq!(decoded[1], AbiValue::Uint(U256::from(1_000_000u64)));
    }

    #[test]
    fn negative_int_round_trips_as_twos_complement() {
        let value = AbiValue::Int(-42);
        let word = value.encode_word();
        let decoded = decode(&word, &[AbiType::Int]).unwrap();
        assert_eq!(decoded[0], AbiValue::Int(-42));
    }

    #[test]
    fn bool_decodes_from_low_byte() {
        let mut word = [0u8; 32];
        word[31] = 1;
        assert_eq!(decode(&word, &[AbiType::Bool]).unwrap()[0], AbiValue::Bool(true));
    }

    #[test]
    fn parse_eth_call_response_propagates_rpc_error() {
        let response = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "boom"}});
        assert!(parse_eth_call_response(&response).is_err());
    }

    #[test]
    fn parse_eth_call_response_decodes_result() {
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": "0x0102"});
        assert_eq!(parse_eth_call_response(&response).unwrap(), vec![0x01, 0x02]);
    }
}
