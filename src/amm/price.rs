//! Slippage and constant-product quote helpers
//!
//! Integer-only: amounts are smallest units, rates are basis points.

use crate::error::{Error, Result};

/// Basis points in 100%
pub const BPS_DENOMINATOR: u128 = 10_000;

fn check_bps(bps: u32) -> Result<u128> {
    if bps as u128 > BPS_DENOMINATOR {
        return Err(Error::InvalidParameter(format!(
            "basis points {} exceed {}",
            bps, BPS_DENOMINATOR
        )));
    }
    Ok(bps as u128)
}

/// Minimum amount to receive given an expected output and a slippage tolerance
pub fn min_amount_out_with_slippage(expected: u128, slippage_bps: u32) -> Result<u128> {
    let bps = check_bps(slippage_bps)?;
    let factor = BPS_DENOMINATOR - bps;
    expected
        .checked_mul(factor)
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or_else(|| Error::InvalidParameter("slippage arithmetic overflow".to_string()))
}

/// Maximum amount to spend given an expected input and a slippage tolerance
pub fn max_amount_in_with_slippage(expected: u128, slippage_bps: u32) -> Result<u128> {
    let bps = check_bps(slippage_bps)?;
    let factor = BPS_DENOMINATOR + bps;
    expected
        .checked_mul(factor)
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or_else(|| Error::InvalidParameter("slippage arithmetic overflow".to_string()))
}

/// Apply a basis-point fraction to an amount, rounding down
pub fn apply_bps(amount: u128, bps: u32) -> Result<u128> {
    let bps = check_bps(bps)?;
    amount
        .checked_mul(bps)
        .map(|v| v / BPS_DENOMINATOR)
        .ok_or_else(|| Error::InvalidParameter("fee arithmetic overflow".to_string()))
}

/// Output of an exact-input constant-product swap after a total fee in bps
///
/// `amount_out = reserve_out * in_after_fee / (reserve_in + in_after_fee)`
pub fn quote_exact_in(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    total_fee_bps: u32,
) -> Result<u128> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::InvalidParameter("pool has no liquidity".to_string()));
    }
    let fee = apply_bps(amount_in, total_fee_bps)?;
    let in_after_fee = amount_in - fee;

    let overflow = || Error::InvalidParameter("quote arithmetic overflow".to_string());
    let numerator = reserve_out.checked_mul(in_after_fee).ok_or_else(overflow)?;
    let denominator = reserve_in.checked_add(in_after_fee).ok_or_else(overflow)?;
    Ok(numerator / denominator)
}

/// Price impact of a quote in basis points relative to the spot price
pub fn price_impact_bps(reserve_in: u128, reserve_out: u128, amount_in: u128, amount_out: u128) -> u32 {
    if amount_in == 0 || reserve_in == 0 {
        return 0;
    }
    // spot_out = amount_in * reserve_out / reserve_in
    let spot_out = match amount_in.checked_mul(reserve_out) {
        Some(v) => v / reserve_in,
        None => return 0,
    };
    if spot_out == 0 || amount_out >= spot_out {
        return 0;
    }
    ((spot_out - amount_out).saturating_mul(BPS_DENOMINATOR) / spot_out) as u32
}
