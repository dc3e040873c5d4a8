//! The latest (price, volume, time) triple for one pair from one source
//! (spec §3).

use crate::decimal::Decimal;
use std::time::SystemTime;

/// Default staleness cutoff: tickers older than this are suppressed from
/// [`crate::provider::Provider::get_ticker_prices`] (spec §4.1, §8).
pub const DEFAULT_STALE_CUTOFF: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct TickerPrice {
    /// Quote-per-base.
    pub price: Decimal,
    /// Base-denominated, trailing 24h window. 0 is permitted when unknown.
    pub volume: Decimal,
    /// Producer's best estimate of the observation timestamp.
    pub time: SystemTime,
}

impl TickerPrice {
    pub fn new(price: Decimal, volume: Decimal, time: SystemTime) -> Self {
        Self {
            price,
            volume,
            time,
        }
    }

    pub fn is_stale(&self, now: SystemTime, cutoff: std::time::Duration) -> bool {
        match now.duration_since(self.time) {
            Ok(age) => age > cutoff,
            // `time` is in the future relative to `now`: not stale.
            Err(_) => false,
        }
    }
}
