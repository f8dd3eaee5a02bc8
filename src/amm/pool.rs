//! Pool snapshot as reported by the settlement service
//!
//! The remote service owns and mutates pools; the client only reads.

use serde::{Deserialize, Serialize};

use super::price::quote_exact_in;
use super::tick::TickRange;
use crate::error::{Error, Result};

/// Curve type of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurveType {
    ConstantProduct,
    SingleSided,
    Concentrated,
}

impl std::fmt::Display for CurveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveType::ConstantProduct => write!(f, "constant_product"),
            CurveType::SingleSided => write!(f, "single_sided"),
            CurveType::Concentrated => write!(f, "concentrated"),
        }
    }
}

/// Bonding-curve phase of a single-sided pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondingPhase {
    /// Progress toward graduation in basis points
    pub progress_bps: u32,
    /// Whether the pool has graduated to two-sided trading
    pub graduated: bool,
}

/// Fee rates in basis points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRates {
    pub lp_fee_bps: u32,
    pub host_fee_bps: u32,
    #[serde(default)]
    pub integrator_fee_bps: u32,
}

impl FeeRates {
    pub fn total_bps(&self) -> u32 {
        self.lp_fee_bps
            .saturating_add(self.host_fee_bps)
            .saturating_add(self.integrator_fee_bps)
    }
}

/// Read-only pool snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Custody identity public key; doubles as the pool id
    pub pool_id: String,
    pub asset_a_address: String,
    pub asset_b_address: String,
    pub fees: FeeRates,
    pub curve_type: CurveType,
    #[serde(with = "crate::api::types::amount")]
    pub reserve_a: u128,
    #[serde(with = "crate::api::types::amount")]
    pub reserve_b: u128,
    #[serde(default)]
    pub bonding_phase: Option<BondingPhase>,
    #[serde(default)]
    pub tick_spacing: Option<u32>,
}

impl Pool {
    /// Whether `asset` is one side of this pool
    pub fn contains(&self, asset: &str) -> bool {
        self.asset_a_address == asset || self.asset_b_address == asset
    }

    /// Asset on the other side of `asset_in`
    pub fn counter_asset(&self, asset_in: &str) -> Result<&str> {
        if self.asset_a_address == asset_in {
            Ok(&self.asset_b_address)
        } else if self.asset_b_address == asset_in {
            Ok(&self.asset_a_address)
        } else {
            Err(Error::InvalidParameter(format!(
                "asset {} is not part of pool {}",
                asset_in, self.pool_id
            )))
        }
    }

    /// Local constant-product estimate, used for slippage bounds before a remote simulation
    pub fn estimate_swap_out(&self, asset_in: &str, amount_in: u128) -> Result<u128> {
        if self.curve_type == CurveType::Concentrated {
            return Err(Error::InvalidParameter(
                "concentrated pools cannot be quoted from reserves".to_string(),
            ));
        }
        if self.is_bonding() {
            return Err(Error::InvalidParameter(format!(
                "pool {} is on its bonding curve; quote it remotely",
                self.pool_id
            )));
        }
        let (reserve_in, reserve_out) = if asset_in == self.asset_a_address {
            (self.reserve_a, self.reserve_b)
        } else if asset_in == self.asset_b_address {
            (self.reserve_b, self.reserve_a)
        } else {
            return Err(Error::InvalidParameter(format!(
                "asset {} is not part of pool {}",
                asset_in, self.pool_id
            )));
        };
        quote_exact_in(reserve_in, reserve_out, amount_in, self.fees.total_bps())
    }

    /// Validate a tick range against this pool's spacing
    pub fn check_tick_range(&self, range: Option<&TickRange>) -> Result<()> {
        match (self.curve_type, self.tick_spacing, range) {
            (CurveType::Concentrated, Some(spacing), Some(range)) => {
                if range.is_aligned(spacing) {
                    Ok(())
                } else {
                    Err(Error::InvalidParameter(format!(
                        "tick range [{}, {}) not aligned to spacing {}",
                        range.lower, range.upper, spacing
                    )))
                }
            }
            (CurveType::Concentrated, None, _) => Err(Error::InvalidParameter(format!(
                "concentrated pool {} reports no tick spacing",
                self.pool_id
            ))),
            (CurveType::Concentrated, Some(_), None) => Err(Error::InvalidParameter(
                "concentrated pools require a tick range".to_string(),
            )),
            (_, _, Some(_)) => Err(Error::InvalidParameter(format!(
                "pool {} is not concentrated; tick range not accepted",
                self.pool_id
            ))),
            (_, _, None) => Ok(()),
        }
    }

    /// Whether a single-sided pool is still on its bonding curve
    pub fn is_bonding(&self) -> bool {
        self.curve_type == CurveType::SingleSided
            && self.bonding_phase.map(|p| !p.graduated).unwrap_or(true)
    }
}

#[cfg(test)]
pub(crate) fn test_pool(curve_type: CurveType) -> Pool {
    Pool {
        pool_id: "pool-custody-key".to_string(),
        asset_a_address: "token-a".to_string(),
        asset_b_address: crate::wallet::NATIVE_ASSET_ADDRESS.to_string(),
        fees: FeeRates {
            lp_fee_bps: 30,
            host_fee_bps: 10,
            integrator_fee_bps: 0,
        },
        curve_type,
        reserve_a: 1_000_000_000,
        reserve_b: 50_000_000,
        bonding_phase: None,
        tick_spacing: if curve_type == CurveType::Concentrated {
            Some(60)
        } else {
            None
        },
    }
}
