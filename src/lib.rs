//! Price-feed provider subsystem: the runtime that hosts dozens of
//! source-specific providers, each maintaining a fresh, normalized ticker
//! map for its subscribed pairs under a uniform contract (spec §1).
//!
//! Bootstrap concerns — CLI/daemon wiring, config-file parsing, the
//! vote-submission loop, telemetry exporters, and installing a `log`
//! subscriber — are out of scope; this crate is consumed by that layer, not
//! a replacement for it.

pub mod chain;
pub mod decimal;
pub mod endpoint;
pub mod error;
pub mod pair;
pub mod provider;
pub mod providers;
pub mod scheduler;
pub mod ticker;
pub mod volume;
pub mod ws;

pub use decimal::Decimal;
pub use endpoint::{Endpoint, PingType};
pub use error::{ProviderError, Result};
pub use pair::CurrencyPair;
pub use provider::{Provider, ProviderHandle, SharedProvider};
pub use ticker::TickerPrice;
pub use volume::{VolumeBucket, VolumeHandler};
