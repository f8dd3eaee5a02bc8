//! Tick math for concentrated-liquidity pools
//!
//! Prices relate to ticks by `price = 1.0001^tick`. Raw prices are quoted as
//! smallest units of asset B per smallest unit of asset A; human prices
//! account for each asset's decimals and for which asset is the pricing base.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lowest supported tick
pub const MIN_TICK: i32 = -887_272;

/// Highest supported tick
pub const MAX_TICK: i32 = 887_272;

/// Significant digits in prices returned by [`tick_to_price`]
pub const PRICE_SIGNIFICANT_DIGITS: u64 = 40;

/// Precision carried through intermediate products
const WORKING_PRECISION: u64 = 60;

const TICK_BASE: f64 = 1.0001;
const TICK_BASE_STR: &str = "1.0001";

/// How to snap a tick onto the spacing grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickRounding {
    Floor,
    Ceil,
    Nearest,
}

/// Which asset a human price is quoted in units of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingBase {
    /// Price of one whole asset A in asset B
    AssetA,
    /// Price of one whole asset B in asset A
    AssetB,
}

/// Decimal precision of each pool asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDecimals {
    pub asset_a: u8,
    pub asset_b: u8,
}

/// Half-open tick range with `lower < upper`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    pub fn new(lower: i32, upper: i32) -> Result<Self> {
        check_tick(lower as i64)?;
        check_tick(upper as i64)?;
        if lower >= upper {
            return Err(Error::InvalidParameter(format!(
                "tick range lower {} must be below upper {}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Both bounds sit on the spacing grid
    pub fn is_aligned(&self, spacing: u32) -> bool {
        match i32::try_from(spacing) {
            Ok(s) if s > 0 => self.lower % s == 0 && self.upper % s == 0,
            _ => false,
        }
    }
}

/// Validate that a tick lies within the supported bounds
pub fn check_tick(tick: i64) -> Result<i32> {
    if tick < MIN_TICK as i64 || tick > MAX_TICK as i64 {
        return Err(Error::InvalidTick {
            tick,
            min: MIN_TICK,
            max: MAX_TICK,
        });
    }
    Ok(tick as i32)
}

/// Convert a raw price to the nearest tick
pub fn price_to_tick(price: f64) -> Result<i32> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice(format!(
            "price must be positive and finite, got {}",
            price
        )));
    }

    let raw = price.ln() / TICK_BASE.ln();
    let rounded = raw.round();
    if !rounded.is_finite() {
        return Err(Error::InvalidPrice(format!(
            "price {} produces a non-finite tick",
            price
        )));
    }

    check_tick(rounded as i64)
}

/// Convert a decimal price string (as produced by [`tick_to_price`]) to the nearest tick
pub fn price_str_to_tick(price: &str) -> Result<i32> {
    let value = f64::from_str(price.trim())
        .map_err(|e| Error::InvalidPrice(format!("cannot parse price '{}': {}", price, e)))?;
    price_to_tick(value)
}

/// Exact `1.0001^tick` rendered as a plain decimal string
pub fn tick_to_price(tick: i32) -> Result<String> {
    let price = tick_to_price_decimal(tick)?;
    Ok(render(&price))
}

fn tick_to_price_decimal(tick: i32) -> Result<BigDecimal> {
    check_tick(tick as i64)?;

    let mut base = decimal(TICK_BASE_STR)?;
    let mut result = BigDecimal::from(1i64);
    let mut exponent = tick.unsigned_abs();

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (&result * &base).with_prec(WORKING_PRECISION);
        }
        base = (&base * &base).with_prec(WORKING_PRECISION);
        exponent >>= 1;
    }

    if tick < 0 {
        result = BigDecimal::from(1i64) / result;
    }
    Ok(result)
}

/// Snap a tick onto the spacing grid
pub fn round_tick(tick: i32, spacing: u32, mode: TickRounding) -> Result<i32> {
    let snapped = snap(tick as i64, spacing, mode)?;
    check_tick(snapped)
}

fn snap(tick: i64, spacing: u32, mode: TickRounding) -> Result<i64> {
    if spacing == 0 {
        return Err(Error::InvalidParameter(
            "tick spacing must be positive".to_string(),
        ));
    }
    let s = spacing as i64;
    let floor = tick.div_euclid(s) * s;
    Ok(match mode {
        TickRounding::Floor => floor,
        TickRounding::Ceil => {
            if floor == tick {
                floor
            } else {
                floor + s
            }
        }
        TickRounding::Nearest => {
            if (tick - floor) * 2 >= s {
                floor + s
            } else {
                floor
            }
        }
    })
}

/// Lowest and highest ticks on the spacing grid that stay within bounds
pub fn usable_tick_bounds(spacing: u32) -> Result<(i32, i32)> {
    let low = snap(MIN_TICK as i64, spacing, TickRounding::Ceil)?;
    let high = snap(MAX_TICK as i64, spacing, TickRounding::Floor)?;
    if low >= high {
        return Err(Error::InvalidParameter(format!(
            "tick spacing {} leaves no usable range",
            spacing
        )));
    }
    Ok((low as i32, high as i32))
}

/// Convert a human price to a raw price (asset B units per asset A unit)
pub fn human_price_to_raw(price: f64, decimals: AssetDecimals, base: PricingBase) -> Result<f64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice(format!(
            "price must be positive and finite, got {}",
            price
        )));
    }
    let b_per_a = match base {
        PricingBase::AssetA => price,
        PricingBase::AssetB => 1.0 / price,
    };
    let shift = decimals.asset_b as i32 - decimals.asset_a as i32;
    Ok(b_per_a * 10f64.powi(shift))
}

/// Convert a human price straight to the nearest tick
pub fn human_price_to_tick(price: f64, decimals: AssetDecimals, base: PricingBase) -> Result<i32> {
    price_to_tick(human_price_to_raw(price, decimals, base)?)
}

/// Human price at a tick, as a plain decimal string
pub fn tick_to_human_price(tick: i32, decimals: AssetDecimals, base: PricingBase) -> Result<String> {
    let raw = tick_to_price_decimal(tick)?;
    let shift = decimals.asset_a as i32 - decimals.asset_b as i32;
    let b_per_a = (&raw * &decimal(&format!("1e{}", shift))?).with_prec(WORKING_PRECISION);
    let price = match base {
        PricingBase::AssetA => b_per_a,
        PricingBase::AssetB => BigDecimal::from(1i64) / b_per_a,
    };
    Ok(render(&price))
}

/// Convert a `[lower, upper)` human price pair into an aligned tick range
///
/// The lower bound is rounded down and the upper bound up; when the pricing
/// base is asset B the tick order flips, so bounds are sorted before snapping.
pub fn price_range_to_ticks(
    price_lower: f64,
    price_upper: f64,
    spacing: u32,
    decimals: AssetDecimals,
    base: PricingBase,
) -> Result<TickRange> {
    if !(price_upper > price_lower) {
        return Err(Error::InvalidPrice(format!(
            "upper price {} must exceed lower price {}",
            price_upper, price_lower
        )));
    }
    let (usable_low, usable_high) = usable_tick_bounds(spacing)?;

    let a = human_price_to_tick(price_lower, decimals, base)?;
    let b = human_price_to_tick(price_upper, decimals, base)?;
    let (low, high) = if a <= b { (a, b) } else { (b, a) };

    let mut lower = snap(low as i64, spacing, TickRounding::Floor)?.max(usable_low as i64);
    let mut upper = snap(high as i64, spacing, TickRounding::Ceil)?.min(usable_high as i64);

    if lower >= upper {
        upper = lower + spacing as i64;
        if upper > usable_high as i64 {
            upper = usable_high as i64;
            lower = upper - spacing as i64;
        }
    }

    TickRange::new(lower as i32, upper as i32)
}

fn decimal(s: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(s).map_err(|e| Error::Internal(format!("decimal '{}': {}", s, e)))
}

fn render(value: &BigDecimal) -> String {
    value
        .with_prec(PRICE_SIGNIFICANT_DIGITS)
        .normalized()
        .to_plain_string()
}
