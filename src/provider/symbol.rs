//! `symbolFn` — the pair-orientation decision function used by
//! [`super::Provider::set_pairs`] (spec §4.1).
//!
//! The default simply mirrors the canonical `Base||Quote` form, and most
//! providers use it as-is. A concrete provider overrides it when its wire
//! symbol genuinely differs from that form — `providers::cex::kraken`'s
//! legacy asset-code table, `providers::cex::upbit`'s reversed `QUOTE-BASE`
//! market code, `providers::cex::coinbase`'s dashed product id, and
//! `providers::cex::okx`'s dashed `instId` all supply their own. Either way,
//! [`super::Provider`] state is always keyed on whatever form the provider's
//! chosen `symbolFn` produces, so a provider's ticker writes must use that
//! same form consistently.

use crate::pair::CurrencyPair;

pub type SymbolFn = fn(&CurrencyPair) -> String;

pub fn canonical(pair: &CurrencyPair) -> String {
    pair.canonical()
}
