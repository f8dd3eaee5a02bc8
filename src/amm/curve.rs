//! Bonding-curve reserve derivation for single-sided pools
//!
//! A single-sided pool starts on a virtual constant-product curve and
//! graduates once `threshold` units of asset A have been sold. The virtual
//! reserves are chosen so the marginal price is continuous across
//! graduation, which only holds with exact integer floor division.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Graduation threshold percentage must be strictly above this value
pub const MIN_GRADUATION_PCT_EXCLUSIVE: u32 = 50;

/// Graduation threshold percentage may not exceed this value
pub const MAX_GRADUATION_PCT: u32 = 95;

/// Inputs for the bonding-curve derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondingCurveParams {
    /// Initial supply of asset A deposited into the pool (smallest units)
    pub initial_supply: u128,
    /// Amount of asset B to raise before graduation (smallest units)
    pub target_raise: u128,
    /// Percentage of supply that must be sold to graduate
    pub graduation_threshold_pct: u32,
}

/// Derived virtual reserves and graduation threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondingCurveReserves {
    pub virtual_reserve_a: u128,
    pub virtual_reserve_b: u128,
    pub threshold: u128,
}

impl BondingCurveParams {
    pub fn new(initial_supply: u128, target_raise: u128, graduation_threshold_pct: u32) -> Self {
        Self {
            initial_supply,
            target_raise,
            graduation_threshold_pct,
        }
    }

    /// Derive virtual reserves. All three values or an error, never a partial result.
    pub fn derive(&self) -> Result<BondingCurveReserves> {
        derive_virtual_reserves(
            self.initial_supply,
            self.target_raise,
            self.graduation_threshold_pct,
        )
    }
}

/// Compute bonding-curve virtual reserves
///
/// ```text
/// denom = 2p - 100
/// virtual_reserve_a = floor(S * p^2 / (100 * denom))
/// virtual_reserve_b = floor(T * (100 - p) / denom)
/// threshold         = floor(S * p / 100)
/// ```
pub fn derive_virtual_reserves(
    initial_supply: u128,
    target_raise: u128,
    graduation_threshold_pct: u32,
) -> Result<BondingCurveReserves> {
    if initial_supply == 0 {
        return Err(Error::InvalidParameter(
            "initial supply must be positive".to_string(),
        ));
    }
    if target_raise == 0 {
        return Err(Error::InvalidParameter(
            "target raise must be positive".to_string(),
        ));
    }
    let p = graduation_threshold_pct;
    if p <= MIN_GRADUATION_PCT_EXCLUSIVE || p > MAX_GRADUATION_PCT {
        return Err(Error::InvalidParameter(format!(
            "graduation threshold {}% outside supported band ({}, {}]",
            p, MIN_GRADUATION_PCT_EXCLUSIVE, MAX_GRADUATION_PCT
        )));
    }

    let p = p as u128;
    // Positive for every p in the band
    let denom = (2 * p)
        .checked_sub(100)
        .filter(|d| *d > 0)
        .ok_or_else(|| {
            Error::InvalidConfiguration(format!("2p - 100 must be positive (p = {})", p))
        })?;

    let overflow = || Error::InvalidParameter("bonding curve arithmetic overflow".to_string());

    let virtual_reserve_a = initial_supply
        .checked_mul(p * p)
        .ok_or_else(overflow)?
        / (100 * denom);

    let virtual_reserve_b = target_raise
        .checked_mul(100 - p)
        .ok_or_else(overflow)?
        / denom;

    let threshold = initial_supply.checked_mul(p).ok_or_else(overflow)? / 100;
    if threshold == 0 {
        return Err(Error::InvalidParameter(format!(
            "initial supply {} too small for a {}% graduation threshold",
            initial_supply, p
        )));
    }

    Ok(BondingCurveReserves {
        virtual_reserve_a,
        virtual_reserve_b,
        threshold,
    })
}

impl BondingCurveReserves {
    /// Progress toward graduation in basis points, capped at 10000
    pub fn graduation_progress_bps(&self, sold: u128) -> u32 {
        if self.threshold == 0 {
            return 10_000;
        }
        let bps = sold.saturating_mul(10_000) / self.threshold;
        bps.min(10_000) as u32
    }

    /// Whether `sold` units of asset A reach the graduation threshold.
    /// Derived reserves always carry a positive threshold.
    pub fn is_graduated(&self, sold: u128) -> bool {
        sold >= self.threshold
    }
}
