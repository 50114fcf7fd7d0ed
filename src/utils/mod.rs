//! Shared helpers: input limits and the sequence bit set.

pub mod bitset;
pub mod validation;
