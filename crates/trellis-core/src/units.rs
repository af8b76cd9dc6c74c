//! Base-unit / human-unit conversion
//!
//! The ledger carries integer base units; the domain model and all operator
//! I/O carry human units scaled by `10^decimals`. Every aggregation path
//! (treasury, claims, allocations) applies the conversion exactly once;
//! a zero- or double-conversion is a known failure class in this system,
//! which is why there is exactly one pair of functions for it.

/// Token decimals of the observed deployment
pub const TOKEN_DECIMALS: u32 = 9;

/// Convert integer base units to a human-readable amount
pub fn to_human(base: u64, decimals: u32) -> f64 {
    base as f64 / 10f64.powi(decimals as i32)
}

/// Convert a human-readable amount to integer base units, rounding to the
/// nearest unit
pub fn to_base(human: f64, decimals: u32) -> u64 {
    (human * 10f64.powi(decimals as i32)).round() as u64
}
