//! Currency pairs and the canonical symbol used as the key in every
//! external-facing map (spec §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (Base, Quote) asset pair. Price is quote-per-base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Swapped orientation: `{Quote, Base}`.
    pub fn swap(&self) -> CurrencyPair {
        CurrencyPair {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    pub fn join(&self, sep: &str) -> String {
        format!("{}{}{}", self.base, sep, self.quote)
    }

    /// Canonical display: `Base||Quote`, upper-case, no separator. Stable
    /// and case-sensitive upper-case (spec invariant 4): two pairs with
    /// equal canonical symbols refer to the same asset pair.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.base.to_uppercase(), self.quote.to_uppercase())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_reverses_base_and_quote() {
        let p = CurrencyPair::new("ATOM", "USDT");
        let s = p.swap();
        assert_eq!(s.base, "USDT");
        assert_eq!(s.quote, "ATOM");
    }

    #[test]
    fn canonical_is_upper_no_separator() {
        let p = CurrencyPair::new("atom", "usdt");
        assert_eq!(p.canonical(), "ATOMUSDT");
    }

    #[test]
    fn join_uses_separator() {
        let p = CurrencyPair::new("BTC", "USDT");
        assert_eq!(p.join("-"), "BTC-USDT");
    }
}
