//! Spec §4.5 Volume Handler, exercised the way an on-chain provider's
//! poll tick drives it: observe the tip, ask what's missing, fill it, read
//! the window sum back.

use price_feed_core::{Decimal, VolumeBucket, VolumeHandler};

fn amount(n: i64) -> Decimal {
    Decimal::from_str_truncating(&n.to_string())
}

#[test]
fn fresh_symbol_reports_unknown_until_first_observation() {
    let handler = VolumeHandler::new(24, ["ATOMUSDT".to_string()]);
    let (volume, known) = handler.get("ATOMUSDT");
    assert!(!known);
    assert_eq!(volume, Decimal::ZERO);
    assert!(handler.missing("ATOMUSDT", 10).is_empty());
}

#[test]
fn full_fill_cycle_mirrors_an_on_chain_poll_tick() {
    let handler = VolumeHandler::new(5, ["BTCUSDT".to_string()]);

    // Tick 1: chain tip is 100, nothing filled yet.
    handler.observe_tip("BTCUSDT", 100);
    let missing = handler.missing("BTCUSDT", 50_000);
    assert_eq!(missing, vec![96, 97, 98, 99, 100]);

    // Fill every missing bucket from one eth_getLogs-shaped response.
    let buckets: Vec<VolumeBucket> = missing
        .iter()
        .map(|&id| VolumeBucket::new(id, amount((id - 95) as i64)))
        .collect();
    handler.add("BTCUSDT", &buckets);

    assert!(handler.missing("BTCUSDT", 50_000).is_empty());
    let (sum, known) = handler.get("BTCUSDT");
    assert!(known);
    assert_eq!(sum, amount(1 + 2 + 3 + 4 + 5));

    // Tick 2: tip advances by one block; only the new bucket is missing,
    // and the oldest bucket (96) falls out of the window on the next add.
    handler.observe_tip("BTCUSDT", 101);
    assert_eq!(handler.missing("BTCUSDT", 50_000), vec![101]);
    handler.add("BTCUSDT", &[VolumeBucket::new(101, amount(6))]);

    let (sum, _) = handler.get("BTCUSDT");
    // Bucket 96 (amount 1) evicted; window is now [97, 98, 99, 100, 101].
    assert_eq!(sum, amount(2 + 3 + 4 + 5 + 6));
}

#[test]
fn missing_is_capped_at_the_requested_limit() {
    let handler = VolumeHandler::new(10, [] as [String; 0]);
    handler.observe_tip("ETHUSDT", 50);
    let missing = handler.missing("ETHUSDT", 3);
    assert_eq!(missing.len(), 3);
    assert_eq!(missing, vec![41, 42, 43]);
}

#[test]
fn add_with_empty_slice_is_a_no_op() {
    let handler = VolumeHandler::new(24, ["ATOMUSDT".to_string()]);
    handler.add("ATOMUSDT", &[]);
    let (_, known) = handler.get("ATOMUSDT");
    assert!(!known);
}

#[test]
fn symbols_tracks_both_seeded_and_newly_observed_entries() {
    let handler = VolumeHandler::new(24, ["ATOMUSDT".to_string()]);
    handler.observe_tip("NEWSYM", 1);
    let mut symbols = handler.symbols();
    symbols.sort();
    assert_eq!(symbols, vec!["ATOMUSDT", "NEWSYM"]);
}
