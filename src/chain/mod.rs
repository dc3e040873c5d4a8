//! Chain/EVM RPC Helpers — spec §4.6.
//!
//! Two independent helper sets, both pure request/response builders with no
//! I/O of their own: [`evm`] for `eth_call`/`eth_getLogs`/`eth_getBlockByNumber`
//! JSON-RPC and the minimal ABI codec, and [`cosmwasm`] for the CosmWasm/
//! Cosmos REST surface (`wasm_smart_query`, `cosmos_txs_at`). Concrete
//! on-chain providers own the actual HTTP call via [`crate::provider::Provider`].

pub mod cosmwasm;
pub mod evm;

/// A monotonically increasing JSON-RPC request id source, one per provider
/// connection. Grounded on the JSON-RPC id/version requirement in spec §4.6.
#[derive(Debug, Default)]
pub struct RequestIdSource(std::sync::atomic::AtomicU64);

impl RequestIdSource {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

pub(crate) fn hex_decode(s: &str) -> crate::error::Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(crate::error::ProviderError::Decode(format!(
            "odd-length hex string: {s}"
        )));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| crate::error::ProviderError::Decode(format!("invalid hex byte: {e}")))
        })
        .collect()
}
