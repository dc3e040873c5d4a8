//! Error taxonomy for the provider subsystem (spec §7).
//!
//! Every variant here is *contained* at the tick or message boundary by
//! callers — nothing in this crate panics on a reachable error path.

/// Errors surfaced by provider runtime operations.
///
/// Maps onto the taxonomy in spec §7: Transport, Rate-limit, Decode,
/// Semantic, Configuration, Fatal. Fatal conditions (e.g. a committed
/// decimal literal that fails to parse) are avoided entirely rather than
/// represented here — see [`crate::decimal::Decimal`]'s nil sentinel.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// Connect/read/write failure, timeout, or non-2xx response.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// 429/418 with a `Retry-After` the caller should honor before retrying.
    #[error("rate limited, retry after {0:?}")]
    RateLimited(std::time::Duration),

    /// Malformed JSON or an unexpected schema for a single message/entry.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// price <= 0, missing required fields, spread too wide, unknown symbol.
    #[error("semantic error: {0}")]
    Semantic(String),

    /// A requested pair is not available at this source.
    #[error("pair not available at source: {0}")]
    PairUnavailable(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
