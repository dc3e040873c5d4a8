//! Volume Handler — spec §4.5.
//!
//! A 24h rolling volume store keyed by `(symbol, bucket)`, where a bucket is
//! either a chain block height or an hour-slot identifier depending on the
//! provider. Implemented as a sorted map per symbol with eviction of the
//! oldest key after each add (spec §9's "cyclic cache" design note) — kept
//! in-memory only; the Open Question on optional persistence is resolved in
//! `DESIGN.md` (not built).

use crate::decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// One bucket's volume observation, keyed by block height or hour-slot id.
#[derive(Debug, Clone, Copy)]
pub struct VolumeBucket {
    pub id: u64,
    pub amount: Decimal,
}

impl VolumeBucket {
    pub fn new(id: u64, amount: Decimal) -> Self {
        VolumeBucket { id, amount }
    }
}

struct SymbolWindow {
    buckets: BTreeMap<u64, Decimal>,
    latest_known: u64,
}

impl SymbolWindow {
    fn new() -> Self {
        SymbolWindow {
            buckets: BTreeMap::new(),
            latest_known: 0,
        }
    }

    fn floor(&self, window: u64) -> u64 {
        self.latest_known.saturating_sub(window.saturating_sub(1))
    }

    fn evict(&mut self, window: u64) {
        let floor = self.floor(window);
        self.buckets = self.buckets.split_off(&floor);
    }
}

/// `VolumeHandler` (spec §4.5). `window` is the number of bucket units that
/// make up the 24h range (e.g. 24 for hour-slots, or a block count
/// approximating 24h for an on-chain provider's block time).
pub struct VolumeHandler {
    window: u64,
    symbols: RwLock<HashMap<String, SymbolWindow>>,
}

impl VolumeHandler {
    /// `symbols` seeds the tracked set from the provider's pair list in both
    /// orientations (native and inverse canonical symbols), per spec.
    pub fn new(window: u64, symbols: impl IntoIterator<Item = String>) -> Self {
        let mut map = HashMap::new();
        for symbol in symbols {
            map.entry(symbol).or_insert_with(SymbolWindow::new);
        }
        VolumeHandler {
            window: window.max(1),
            symbols: RwLock::new(map),
        }
    }

    /// Reports the chain's current tip (block height, or hour-slot id) for
    /// `symbol` without supplying a volume — this is what lets
    /// [`Self::missing`] know the window's upper bound before any bucket is
    /// filled for it.
    pub fn observe_tip(&self, symbol: &str, tip: u64) {
        let mut guard = self.symbols.write().unwrap();
        let entry = guard.entry(symbol.to_string()).or_insert_with(SymbolWindow::new);
        if tip > entry.latest_known {
            entry.latest_known = tip;
            entry.evict(self.window);
        }
    }

    /// `Add(volumes[])`: insert/replace buckets for `symbol`; buckets older
    /// than the 24h window (relative to the highest id seen, either from a
    /// bucket here or a prior [`Self::observe_tip`]) are evicted.
    pub fn add(&self, symbol: &str, buckets: &[VolumeBucket]) {
        if buckets.is_empty() {
            return;
        }
        let mut guard = self.symbols.write().unwrap();
        let entry = guard.entry(symbol.to_string()).or_insert_with(SymbolWindow::new);
        for bucket in buckets {
            entry.buckets.insert(bucket.id, bucket.amount);
            if bucket.id > entry.latest_known {
                entry.latest_known = bucket.id;
            }
        }
        entry.evict(self.window);
    }

    /// `Get(symbol) -> Decimal`: sum of current-window volumes, or
    /// `(0, false)` if nothing has been recorded.
    pub fn get(&self, symbol: &str) -> (Decimal, bool) {
        let guard = self.symbols.read().unwrap();
        match guard.get(symbol) {
            Some(entry) if !entry.buckets.is_empty() => {
                let sum = entry
                    .buckets
                    .values()
                    .fold(Decimal::ZERO, |acc, v| acc.checked_add(v));
                (sum, true)
            }
            _ => (Decimal::ZERO, false),
        }
    }

    /// `GetMissing(limit) -> height[]`: bucket ids within the current window
    /// for `symbol` that have not yet been filled, oldest first, capped at
    /// `limit`. Empty until [`Self::observe_tip`] or [`Self::add`] has
    /// established a tip for this symbol.
    pub fn missing(&self, symbol: &str, limit: usize) -> Vec<u64> {
        let guard = self.symbols.read().unwrap();
        let Some(entry) = guard.get(symbol) else {
            return Vec::new();
        };
        if entry.latest_known == 0 {
            return Vec::new();
        }
        let floor = entry.floor(self.window);
        (floor..=entry.latest_known)
            .filter(|id| !entry.buckets.contains_key(id))
            .take(limit)
            .collect()
    }

    /// `Symbols() -> string[]`: the set of symbols being tracked.
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.read().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: i64) -> Decimal {
        Decimal::from_str_truncating(&n.to_string())
    }

    #[test]
    fn get_on_unknown_symbol_is_zero_and_false() {
        let handler = VolumeHandler::new(24, ["ATOMUSDT".to_string()]);
        let (vol, known) = handler.get("ATOMUSDT");
        assert!(!known);
        assert_eq!(vol, Decimal::ZERO);
    }

    #[test]
    fn add_sums_within_window_and_evicts_old_buckets() {
        let handler = VolumeHandler::new(3, [] as [String; 0]);
        handler.add(
            "BTCUSDT",
            &[
                VolumeBucket::new(1, d(10)),
                VolumeBucket::new(2, d(20)),
                VolumeBucket::new(3, d(30)),
            ],
        );
        let (sum, known) = handler.get("BTCUSDT");
        assert!(known);
        assert_eq!(sum, d(60));

        // Bucket 4 pushes the floor to 2, evicting bucket 1.
        handler.add("BTCUSDT", &[VolumeBucket::new(4, d(40))]);
        let (sum, _) = handler.get("BTCUSDT");
        assert_eq!(sum, d(90));
    }

    #[test]
    fn missing_reports_unfilled_ids_in_window() {
        let handler = VolumeHandler::new(3, [] as [String; 0]);
        handler.observe_tip("ETHUSDT", 10);
        assert_eq!(handler.missing("ETHUSDT", 10), vec![8, 9, 10]);

        handler.add("ETHUSDT", &[VolumeBucket::new(9, d(5))]);
        assert_eq!(handler.missing("ETHUSDT", 10), vec![8, 10]);
    }

    #[test]
    fn missing_is_capped_at_limit() {
        let handler = VolumeHandler::new(5, [] as [String; 0]);
        handler.observe_tip("ETHUSDT", 10);
        assert_eq!(handler.missing("ETHUSDT", 2), vec![6, 7]);
    }

    #[test]
    fn symbols_reflects_construction_and_later_adds() {
        let handler = VolumeHandler::new(24, ["ATOMUSDT".to_string(), "USDCUSK".to_string()]);
        handler.add("NEWSYM", &[VolumeBucket::new(1, d(1))]);
        let mut symbols = handler.symbols();
        symbols.sort();
        assert_eq!(symbols, vec!["ATOMUSDT", "NEWSYM", "USDCUSK"]);
    }
}
