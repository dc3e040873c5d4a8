//! Spec §8 universal invariant: decimal parsing.

use price_feed_core::Decimal;

#[test]
fn truncates_beyond_eighteen_fractional_digits() {
    let d = Decimal::from_str_truncating("3.323454654756344465786786524");
    assert_eq!(d.to_string(), "3.323454654756344465");
}

#[test]
fn empty_input_is_nil_not_zero() {
    let nil = Decimal::from_str_truncating("");
    assert!(nil.is_nil());
    assert_ne!(nil, Decimal::ZERO);
    assert_eq!(nil, Decimal::nil());
}

#[test]
fn whitespace_only_input_is_nil() {
    assert!(Decimal::from_str_truncating("   ").is_nil());
}

#[test]
fn nil_propagates_through_arithmetic() {
    let nil = Decimal::nil();
    let one = Decimal::ONE;
    assert!(nil.checked_add(&one).is_nil());
    assert!(one.checked_add(&nil).is_nil());
    assert!(nil.checked_mul(&one).is_nil());
    assert!(one.checked_div(&nil).is_nil());
}

#[test]
fn non_positive_price_is_not_positive() {
    assert!(!Decimal::ZERO.is_positive());
    assert!(!Decimal::from_str_truncating("-1.5").is_positive());
    assert!(Decimal::from_str_truncating("0.0000000000000001").is_positive());
}

#[test]
fn negative_exponents_handled_by_caller_via_inverse() {
    // `checked_pow` only takes non-negative exponents (spec §4.6/§4.2's
    // decimals-normalization factor needs both directions); callers build
    // `10^-n` as `10^n` inverted.
    let ten = Decimal::from_str_truncating("10");
    let positive = ten.checked_pow(6);
    let negative = ten.checked_pow(6).inverse();
    assert_eq!(positive, Decimal::from_str_truncating("1000000"));
    assert_eq!(negative.checked_mul(&positive), Decimal::ONE);
}

#[test]
fn from_f64_round_trips_typical_prices() {
    let d = Decimal::from_f64(12.3456);
    assert_eq!(d, Decimal::from_str_truncating("12.3456"));
}

#[test]
fn from_f64_rejects_non_finite() {
    assert!(Decimal::from_f64(f64::NAN).is_nil());
    assert!(Decimal::from_f64(f64::INFINITY).is_nil());
}
