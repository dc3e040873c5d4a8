//! Concrete providers (spec §4.2) — one module per source family.

pub mod cex;
pub mod onchain;
