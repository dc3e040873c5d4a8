//! Fixed-point decimal model (spec §4.7).
//!
//! Backed by [`rust_decimal::Decimal`] — the crate the teacher repo already
//! reaches for when it needs exact ordering/arithmetic on prices (see the
//! orderbook maps in the Kraken and Crypto.com streaming handlers). `Decimal`
//! here wraps it rather than re-exporting it directly so we can fix the
//! truncating-parse and nil-sentinel behaviour the spec requires at one
//! seam, and so computed prices in this crate can never accidentally round
//! through an `f64`.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal as Inner;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// 18-fractional-digit signed fixed point. A "nil" value (distinguishable
/// from zero) represents a failed parse; callers must check
/// [`Decimal::is_nil`] before publishing a price built from user/network
/// input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decimal(Option<Inner>);

impl Decimal {
    pub const ZERO: Decimal = Decimal(Some(Inner::ZERO));
    pub const ONE: Decimal = Decimal(Some(Inner::ONE));

    /// The sentinel "nil" decimal: not a number, not zero.
    pub const fn nil() -> Decimal {
        Decimal(None)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_none()
    }

    pub fn from_inner(d: Inner) -> Decimal {
        Decimal(Some(d.round_dp(18)))
    }

    pub fn inner(&self) -> Option<Inner> {
        self.0
    }

    /// Parses a decimal string, silently truncating any fractional digits
    /// beyond 18 (chopped off the string before parsing, never rounded). A
    /// non-numeric or empty input yields [`Decimal::nil`].
    pub fn from_str_truncating(s: &str) -> Decimal {
        let s = s.trim();
        if s.is_empty() {
            return Decimal::nil();
        }
        let truncated = match s.split_once('.') {
            Some((int_part, frac_part)) if frac_part.len() > 18 => {
                format!("{int_part}.{}", &frac_part[..18])
            }
            _ => s.to_string(),
        };
        match Inner::from_str(&truncated) {
            Ok(d) => Decimal(Some(d)),
            Err(_) => Decimal::nil(),
        }
    }

    /// Builds a decimal from an `f64` via its shortest round-trip string
    /// form, then parses that — never constructs a `Decimal` straight from
    /// float bit patterns (spec §9: "do not compute prices through 64-bit
    /// float").
    pub fn from_f64(f: f64) -> Decimal {
        if !f.is_finite() {
            return Decimal::nil();
        }
        Decimal::from_str_truncating(&format!("{f}"))
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.and_then(|d| d.to_f64())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.0, Some(d) if d.is_zero())
    }

    pub fn is_positive(&self) -> bool {
        matches!(self.0, Some(d) if d.is_sign_positive() && !d.is_zero())
    }

    pub fn checked_add(&self, other: &Decimal) -> Decimal {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a
                .checked_add(b)
                .map(Decimal::from_inner)
                .unwrap_or_else(Decimal::nil),
            _ => Decimal::nil(),
        }
    }

    pub fn checked_sub(&self, other: &Decimal) -> Decimal {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a
                .checked_sub(b)
                .map(Decimal::from_inner)
                .unwrap_or_else(Decimal::nil),
            _ => Decimal::nil(),
        }
    }

    pub fn checked_mul(&self, other: &Decimal) -> Decimal {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a
                .checked_mul(b)
                .map(Decimal::from_inner)
                .unwrap_or_else(Decimal::nil),
            _ => Decimal::nil(),
        }
    }

    /// Division by zero (or either operand being nil) returns the nil
    /// sentinel; callers must check before publishing.
    pub fn checked_div(&self, other: &Decimal) -> Decimal {
        match (self.0, other.0) {
            (Some(a), Some(b)) if !b.is_zero() => a
                .checked_div(b)
                .map(Decimal::from_inner)
                .unwrap_or_else(Decimal::nil),
            _ => Decimal::nil(),
        }
    }

    /// `1 / self`; nil if `self` is nil or zero.
    pub fn inverse(&self) -> Decimal {
        Decimal::ONE.checked_div(self)
    }

    /// Power(0) = 1; repeated multiplication for exponents up to 256.
    pub fn checked_pow(&self, exp: u32) -> Decimal {
        if exp > 256 {
            return Decimal::nil();
        }
        let Some(base) = self.0 else {
            return Decimal::nil();
        };
        let mut acc = Inner::ONE;
        for _ in 0..exp {
            match acc.checked_mul(base) {
                Some(v) => acc = v,
                None => return Decimal::nil(),
            }
        }
        Decimal::from_inner(acc)
    }

    /// Returns a decimal whose square is within ±1 ulp (at 18 decimal
    /// digits) of `self`, via Newton's method. Nil for negative inputs.
    pub fn approx_sqrt(&self) -> Decimal {
        let Some(x) = self.0 else {
            return Decimal::nil();
        };
        if x.is_sign_negative() {
            return Decimal::nil();
        }
        if x.is_zero() {
            return Decimal::ZERO;
        }

        let two = Inner::from(2u8);
        // Initial guess: x itself bounds the root from above for x >= 1,
        // and 1 bounds it from above for x < 1.
        let mut guess = if x > Inner::ONE { x } else { Inner::ONE };
        for _ in 0..100 {
            let next = match (guess.checked_add(x.checked_div(guess).unwrap_or(Inner::ZERO)))
                .map(|s| s.checked_div(two))
            {
                Some(Some(n)) => n.round_dp(18),
                _ => return Decimal::nil(),
            };
            if (next - guess).abs() <= Inner::new(1, 18) {
                return Decimal::from_inner(next);
            }
            guess = next;
        }
        Decimal::from_inner(guess)
    }

    pub fn cmp_value(&self) -> Option<Inner> {
        self.0
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::ZERO
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{d}"),
            None => write!(f, "nil"),
        }
    }
}

impl FromStr for Decimal {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Decimal::from_str_truncating(s))
    }
}

impl From<Inner> for Decimal {
    fn from(d: Inner) -> Self {
        Decimal::from_inner(d)
    }
}
