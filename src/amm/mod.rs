//! AMM math
//!
//! Pure numeric helpers shared by the orchestrator and the CLI:
//! - bonding-curve virtual reserves for single-sided pools
//! - tick/price conversion for concentrated liquidity
//! - slippage bounds and constant-product quotes
//!
//! # WARNING: Exact rounding
//! Bonding-curve values must be computed with integer floor division.
//! The remote service recomputes them and rejects any mismatch.

pub mod curve;
pub mod pool;
pub mod price;
pub mod tick;

// Re-export commonly used types
pub use curve::{derive_virtual_reserves, BondingCurveParams, BondingCurveReserves};
pub use pool::{CurveType, FeeRates, Pool};
pub use tick::{
    price_range_to_ticks, price_to_tick, round_tick, tick_to_price, AssetDecimals, PricingBase,
    TickRange, TickRounding, MAX_TICK, MIN_TICK,
};
