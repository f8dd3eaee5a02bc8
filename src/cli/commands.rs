//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::amm::tick;
use crate::amm::{AssetDecimals, BondingCurveParams, PricingBase, TickRounding};
use crate::api::{HttpClient, SettlementApi};
use crate::classifier;
use crate::config::Config;

/// Derive bonding-curve reserves for a single-sided pool
pub fn curve(initial_supply: u128, target_raise: u128, graduation_pct: u32) -> Result<()> {
    let params = BondingCurveParams::new(initial_supply, target_raise, graduation_pct);
    let reserves = params.derive().context("Bonding-curve derivation failed")?;

    println!("\n=== BONDING CURVE ===\n");
    println!("Initial supply:     {}", initial_supply);
    println!("Target raise:       {}", target_raise);
    println!("Graduation at:      {}%", graduation_pct);
    println!();
    println!("virtualReserveA:    {}", reserves.virtual_reserve_a);
    println!("virtualReserveB:    {}", reserves.virtual_reserve_b);
    println!("threshold:          {}", reserves.threshold);
    Ok(())
}

pub fn tick_to_price(tick: i32) -> Result<()> {
    let price = tick::tick_to_price(tick)?;
    println!("tick {} => price {}", tick, price);
    Ok(())
}

pub fn tick_from_price(price: &str) -> Result<()> {
    let tick = tick::price_str_to_tick(price)?;
    println!("price {} => tick {}", price, tick);
    Ok(())
}

pub fn tick_round(tick: i32, spacing: u32, mode: TickRounding) -> Result<()> {
    let rounded = tick::round_tick(tick, spacing, mode)?;
    let (low, high) = tick::usable_tick_bounds(spacing)?;
    println!(
        "tick {} => {} (spacing {}, {:?}; usable [{}, {}])",
        tick, rounded, spacing, mode, low, high
    );
    Ok(())
}

/// Convert a human price range into an aligned tick range
pub fn range(
    price_lower: f64,
    price_upper: f64,
    spacing: u32,
    decimals: AssetDecimals,
    base: PricingBase,
) -> Result<()> {
    let ticks = tick::price_range_to_ticks(price_lower, price_upper, spacing, decimals, base)?;
    println!(
        "[{}, {}) => ticks [{}, {}) (spacing {})",
        price_lower, price_upper, ticks.lower, ticks.upper, spacing
    );
    println!(
        "  lower tick price: {}",
        tick::tick_to_human_price(ticks.lower, decimals, base)?
    );
    println!(
        "  upper tick price: {}",
        tick::tick_to_human_price(ticks.upper, decimals, base)?
    );
    Ok(())
}

/// Print how the client would treat a remote error code
pub fn classify(code: &str, json: bool) -> Result<()> {
    let classification = classifier::classify(code);
    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(());
    }
    println!("\n=== {} ===\n", code);
    println!("Known:        {}", classification.known);
    println!("Category:     {}", classification.category);
    println!("Recovery:     {}", classification.recovery);
    println!("Retryability: {:?}", classification.retryability);
    if !classification.known {
        warn!(code = %code, "Code not in table, using range default");
    }
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check the settlement service: liveness, feature flags, minimum amounts
pub async fn health(config: &Config) -> Result<()> {
    let client = config.client.resolve();
    info!(
        environment = %client.environment,
        network = %client.network,
        "Checking settlement service"
    );
    let api: Arc<dyn SettlementApi> =
        Arc::new(HttpClient::new(&client.api_base_url, config.http_settings())?);

    println!("\n=== SETTLEMENT SERVICE HEALTH ===\n");
    println!("Endpoint: {}", api_display(&client.api_base_url));

    let (ping, flags, mins) = futures::join!(api.ping(), api.feature_status(), api.min_amounts());

    let mut all_healthy = true;

    print!("Ping... ");
    match ping {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Feature flags... ");
    match flags {
        Ok(flags) => {
            println!("OK");
            let mut names: Vec<_> = flags.0.iter().collect();
            names.sort();
            for (name, enabled) in names {
                println!("  {:<28} {}", name, if *enabled { "on" } else { "off" });
            }
            if flags.is_enabled(crate::policy::MASTER_KILL_SWITCH) {
                println!("  MASTER KILL-SWITCH ENGAGED: all operations blocked");
                all_healthy = false;
            }
        }
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Minimum amounts... ");
    match mins {
        Ok(mins) => {
            println!("OK ({} assets)", mins.0.len());
            let mut entries: Vec<_> = mins.0.iter().collect();
            entries.sort();
            for (asset, min) in entries {
                println!("  {} >= {}", asset, min);
            }
        }
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    println!();
    if all_healthy {
        println!("Settlement service healthy!");
    } else {
        println!("Settlement service is unhealthy. Check the errors above.");
    }

    Ok(())
}

fn api_display(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
