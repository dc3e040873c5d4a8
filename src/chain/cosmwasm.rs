//! CosmWasm smart-contract query and Cosmos REST tx/block helpers (spec
//! §4.6). REST path builders only — the caller performs the actual HTTP GET
//! via [`crate::provider::Provider::http_get`].

use crate::error::{ProviderError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::collections::HashMap;

/// REST path for a `wasm_smart_query`: base64-encodes `json_msg` and embeds
/// it in `/cosmwasm/wasm/v1/contract/{addr}/smart/{b64}`.
pub fn wasm_smart_query_path(contract: &str, json_msg: &Value) -> String {
    let encoded = BASE64.encode(json_msg.to_string());
    format!("/cosmwasm/wasm/v1/contract/{contract}/smart/{encoded}")
}

/// REST path for a `wasm_raw_query`: base64-encodes the raw storage `key`.
pub fn wasm_raw_query_path(contract: &str, key: &[u8]) -> String {
    let encoded = BASE64.encode(key);
    format!("/cosmwasm/wasm/v1/contract/{contract}/raw/{encoded}")
}

/// Decodes the `data` field of a `wasm/smart` or `wasm/raw` query response
/// (itself base64-encoded JSON for `smart`, raw base64 bytes for `raw`).
pub fn decode_wasm_smart_response(response: &Value) -> Result<Value> {
    let data_b64 = response
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Decode("wasm smart response missing data".into()))?;
    let raw = BASE64
        .decode(data_b64)
        .map_err(|e| ProviderError::Decode(format!("invalid base64 in wasm response: {e}")))?;
    serde_json::from_slice(&raw).map_err(ProviderError::Json)
}

pub fn decode_wasm_raw_response(response: &Value) -> Result<Vec<u8>> {
    let data_b64 = response
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Decode("wasm raw response missing data".into()))?;
    BASE64
        .decode(data_b64)
        .map_err(|e| ProviderError::Decode(format!("invalid base64 in wasm response: {e}")))
}

/// REST path for `cosmosTxsAt`: all transactions included in `height`,
/// optionally filtered by message type (`msgTypeFilter`, e.g.
/// `"/cosmwasm.wasm.v1.MsgExecuteContract"`).
pub fn cosmos_txs_at_path(height: u64, msg_type_filter: &[String]) -> String {
    let mut events = vec![format!("tx.height={height}")];
    for msg_type in msg_type_filter {
        events.push(format!("message.action='{msg_type}'"));
    }
    let query = events
        .iter()
        .map(|e| format!("events={e}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("/cosmos/tx/v1beta1/txs?{query}")
}

/// REST path for `cosmosBlockTime`: the block header for `height`, whose
/// `header.time` is this height's timestamp.
pub fn cosmos_block_path(height: u64) -> String {
    format!("/cosmos/base/tendermint/v1beta1/blocks/{height}")
}

/// Parses the ISO-8601 `header.time` field of a block response.
pub fn parse_cosmos_block_time(response: &Value) -> Result<chrono::DateTime<chrono::Utc>> {
    let time_str = response
        .get("block")
        .and_then(|b| b.get("header"))
        .and_then(|h| h.get("time"))
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Decode("block response missing header.time".into()))?;
    chrono::DateTime::parse_from_rfc3339(time_str)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| ProviderError::Decode(format!("invalid block time: {e}")))
}

/// One event attribute list attached to a Cosmos transaction.
#[derive(Debug, Clone)]
pub struct CosmosEvent {
    pub event_type: String,
    pub attributes: HashMap<String, String>,
}

/// A single transaction as returned from `cosmosTxsAt`, exposing
/// `GetEventsByType` for event-driven volume parsing (spec §4.6).
#[derive(Debug, Clone)]
pub struct CosmosTx {
    pub hash: String,
    pub events: Vec<CosmosEvent>,
}

impl CosmosTx {
    pub fn events_by_type<'a>(&'a self, name: &str) -> Vec<&'a CosmosEvent> {
        self.events.iter().filter(|e| e.event_type == name).collect()
    }
}

/// Parses the `tx_responses[].logs[].events` structure of a
/// `/cosmos/tx/v1beta1/txs` response into [`CosmosTx`] entries.
pub fn parse_cosmos_txs(response: &Value) -> Result<Vec<CosmosTx>> {
    let tx_responses = response
        .get("tx_responses")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Decode("txs response missing tx_responses".into()))?;

    tx_responses
        .iter()
        .map(|tx_response| {
            let hash = tx_response
                .get("txhash")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let mut events = Vec::new();
            if let Some(logs) = tx_response.get("logs").and_then(Value::as_array) {
                for log in logs {
                    if let Some(log_events) = log.get("events").and_then(Value::as_array) {
                        for event in log_events {
                            let event_type = event
                                .get("type")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string();
                            let mut attributes = HashMap::new();
                            if let Some(attrs) = event.get("attributes").and_then(Value::as_array) {
                                for attr in attrs {
                                    let (Some(key), Some(value)) = (
                                        attr.get("key").and_then(Value::as_str),
                                        attr.get("value").and_then(Value::as_str),
                                    ) else {
                                        continue;
                                    };
                                    attributes.insert(key.to_string(), value.to_string());
                                }
                            }
                            events.push(CosmosEvent { event_type, attributes });
                        }
                    }
                }
            }
            Ok(CosmosTx { hash, events })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn smart_query_path_embeds_base64_json() {
        let msg = json!({"pool": {}});
        let path = wasm_smart_query_path("osmo1contract", &msg);
        assert!(path.starts_with("/cosmwasm/wasm/v1/contract/osmo1contract/smart/"));
    }

    #[test]
    fn decode_wasm_smart_response_round_trips() {
        let inner = json!({"price": "1.02"});
        let encoded = BASE64.encode(inner.to_string());
        let response = json!({"data": encoded});
        let decoded = decode_wasm_smart_response(&response).unwrap();
        assert_eq!(decoded, inner);
    }

    #[test]
    fn cosmos_txs_at_path_includes_height_and_filters() {
        let path = cosmos_txs_at_path(100, &["/cosmwasm.wasm.v1.MsgExecuteContract".to_string()]);
        assert!(path.contains("tx.height=100"));
        assert!(path.contains("MsgExecuteContract"));
    }

    #[test]
    fn parse_cosmos_txs_extracts_events_by_type() {
        let response = json!({
            "tx_responses": [{
                "txhash": "ABC123",
                "logs": [{
                    "events": [{
                        "type": "wasm",
                        "attributes": [{"key": "action", "value": "swap"}]
                    }]
                }]
            }]
        });
        let txs = parse_cosmos_txs(&response).unwrap();
        assert_eq!(txs.len(), 1);
        let events = txs[0].events_by_type("wasm");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attributes.get("action").unwrap(), "swap");
    }

    #[test]
    fn parse_cosmos_block_time_parses_rfc3339() {
        let response = json!({"block": {"header": {"time": "2024-01-01T00:00:00Z"}}});
        let dt = parse_cosmos_block_time(&response).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
