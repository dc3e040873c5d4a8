//! Spec §8 universal invariants and scenarios 1-4, driven through the public
//! `Provider` contract rather than any one concrete source.

use price_feed_core::{CurrencyPair, Decimal, Endpoint, Provider};
use std::collections::HashSet;
use std::time::{Duration, SystemTime};

fn provider() -> Provider {
    Provider::new("test", Endpoint::default())
}

fn canonical(pair: &CurrencyPair) -> String {
    pair.canonical()
}

/// Scenario 1: direct pair.
#[tokio::test]
async fn direct_pair_is_recorded_verbatim() {
    let p = provider();
    let requested = vec![CurrencyPair::new("ATOM", "USDT")];
    let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
    p.set_pairs(&requested, &available, canonical).await;

    p.set_ticker_price(
        "ATOMUSDT",
        Decimal::from_str_truncating("12.3456"),
        Decimal::from_str_truncating("7654321.98765"),
        SystemTime::now(),
    )
    .await;

    let prices = p.get_ticker_prices(&requested).await;
    let tp = prices.get("ATOMUSDT").expect("ticker present");
    assert_eq!(tp.price, Decimal::from_str_truncating("12.3456"));
    assert_eq!(tp.volume, Decimal::from_str_truncating("7654321.98765"));
}

/// Scenario 2: inverse pair, including the inversion round-trip invariant.
#[tokio::test]
async fn inverse_pair_inverts_price_and_scales_volume() {
    let p = provider();
    let requested = vec![CurrencyPair::new("USDC", "USK")];
    let available: HashSet<String> = ["USKUSDC".to_string()].into_iter().collect();
    p.set_pairs(&requested, &available, canonical).await;

    p.set_ticker_price(
        "USKUSDC",
        Decimal::from_str_truncating("1.0320"),
        Decimal::from_str_truncating("100"),
        SystemTime::now(),
    )
    .await;

    let prices = p.get_ticker_prices(&requested).await;
    let tp = prices.get("USDCUSK").expect("inverted ticker present");
    let expected_price = 1.0f64 / 1.0320f64;
    assert!((tp.price.to_f64().unwrap() - expected_price).abs() < 1e-12);
    assert!((tp.volume.to_f64().unwrap() - 103.2).abs() < 1e-9);
}

/// Scenario 3: stale filtering.
#[tokio::test]
async fn stale_ticker_is_omitted_from_results() {
    let p = provider();
    let requested = vec![CurrencyPair::new("ATOM", "USDT")];
    let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
    p.set_pairs(&requested, &available, canonical).await;

    let ninety_seconds_ago = SystemTime::now() - Duration::from_secs(90);
    p.set_ticker_price(
        "ATOMUSDT",
        Decimal::from_str_truncating("12.3456"),
        Decimal::from_str_truncating("1"),
        ninety_seconds_ago,
    )
    .await;

    assert!(p.get_ticker_prices(&requested).await.is_empty());
}

/// Scenario 4: unknown pair never panics and yields nothing.
#[tokio::test]
async fn unknown_pair_yields_empty_result_without_panic() {
    let p = provider();
    let requested = vec![CurrencyPair::new("FOO", "BAR")];
    let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
    p.set_pairs(&requested, &available, canonical).await;

    assert!(p.get_ticker_prices(&requested).await.is_empty());
    assert!(!p.is_pair("FOOBAR").await);
    assert!(!p.is_pair("BARFOO").await);
}

/// Pair-map disjointness, exercised across a mixed batch of direct, inverse,
/// and unavailable pairs: a pair can resolve into at most one orientation,
/// so `get_all_pairs` never reports the same requested symbol twice.
#[tokio::test]
async fn mixed_batch_resolves_each_pair_to_exactly_one_orientation() {
    let p = provider();
    let requested = vec![
        CurrencyPair::new("ATOM", "USDT"),
        CurrencyPair::new("USDC", "USK"),
        CurrencyPair::new("FOO", "BAR"),
    ];
    let available: HashSet<String> = ["ATOMUSDT".to_string(), "USKUSDC".to_string()]
        .into_iter()
        .collect();
    p.set_pairs(&requested, &available, canonical).await;

    let all = p.get_all_pairs().await;
    // ATOMUSDT resolved direct, USKUSDC resolved inverse, FOOBAR dropped.
    assert_eq!(all.len(), 2);
    assert!(all.contains_key("ATOMUSDT"));
    assert!(all.contains_key("USKUSDC"));
    assert!(!all.contains_key("FOOBAR"));
    assert!(!all.contains_key("BARFOO"));
}

/// A non-positive price is a semantic error (spec §7): the write is
/// dropped rather than corrupting the ticker map.
#[tokio::test]
async fn non_positive_price_is_dropped_not_written() {
    let p = provider();
    let requested = vec![CurrencyPair::new("ATOM", "USDT")];
    let available: HashSet<String> = ["ATOMUSDT".to_string()].into_iter().collect();
    p.set_pairs(&requested, &available, canonical).await;

    p.set_ticker_price("ATOMUSDT", Decimal::ZERO, Decimal::ONE, SystemTime::now())
        .await;

    assert!(p.get_ticker_prices(&requested).await.is_empty());
}
