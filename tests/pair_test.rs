//! Spec §3: `CurrencyPair`'s canonical symbol and swap orientation.

use price_feed_core::CurrencyPair;

#[test]
fn canonical_is_upper_case_no_separator() {
    let pair = CurrencyPair::new("atom", "usdt");
    assert_eq!(pair.canonical(), "ATOMUSDT");
}

#[test]
fn canonical_symbol_is_stable_regardless_of_input_case() {
    let lower = CurrencyPair::new("btc", "usdt");
    let upper = CurrencyPair::new("BTC", "USDT");
    let mixed = CurrencyPair::new("Btc", "Usdt");
    assert_eq!(lower.canonical(), upper.canonical());
    assert_eq!(upper.canonical(), mixed.canonical());
}

#[test]
fn swap_round_trips() {
    let pair = CurrencyPair::new("USDC", "USK");
    let swapped = pair.swap();
    assert_eq!(swapped.base, "USK");
    assert_eq!(swapped.quote, "USDC");
    assert_eq!(swapped.swap(), pair);
}

#[test]
fn display_matches_canonical() {
    let pair = CurrencyPair::new("eth", "usdt");
    assert_eq!(pair.to_string(), pair.canonical());
}

#[test]
fn serde_round_trips() {
    let pair = CurrencyPair::new("ATOM", "USDT");
    let json = serde_json::to_string(&pair).unwrap();
    let back: CurrencyPair = serde_json::from_str(&json).unwrap();
    assert_eq!(pair, back);
}

#[test]
fn distinct_orientations_have_distinct_canonical_symbols() {
    let pair = CurrencyPair::new("ATOM", "USDT");
    assert_ne!(pair.canonical(), pair.swap().canonical());
}
