//! AMM Gateway - client tooling for the settlement gateway
//!
//! Offline helpers for bonding curves, ticks and error codes, plus a live
//! health check against the configured settlement service.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use amm_gateway::amm::{AssetDecimals, PricingBase, TickRounding};
use amm_gateway::cli::commands;
use amm_gateway::config::Config;

/// AMM Gateway client
#[derive(Parser)]
#[command(name = "amm-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs (and classify output) as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive virtual reserves for a single-sided pool
    Curve {
        /// Initial supply of asset A (smallest units)
        #[arg(long)]
        supply: u128,

        /// Asset B to raise before graduation (smallest units)
        #[arg(long)]
        target_raise: u128,

        /// Percentage of supply sold at graduation
        #[arg(long, default_value = "80")]
        graduation_pct: u32,
    },

    /// Tick / price conversions
    Tick {
        #[command(subcommand)]
        action: TickAction,
    },

    /// Convert a human price range to an aligned tick range
    Range {
        lower: f64,
        upper: f64,

        #[arg(long, default_value = "60")]
        spacing: u32,

        #[arg(long, default_value = "8")]
        decimals_a: u8,

        #[arg(long, default_value = "8")]
        decimals_b: u8,

        /// Which asset the prices are quoted per unit of
        #[arg(long, value_enum, default_value = "asset-a")]
        base: BaseArg,
    },

    /// Show how an error code is classified
    Classify { code: String },

    /// Check the settlement service (ping, feature flags, minimum amounts)
    Health,

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum TickAction {
    /// Price at a tick
    ToPrice {
        #[arg(allow_hyphen_values = true)]
        tick: i32,
    },

    /// Nearest tick for a decimal price
    FromPrice { price: String },

    /// Snap a tick onto a spacing grid
    Round {
        #[arg(allow_hyphen_values = true)]
        tick: i32,

        #[arg(long)]
        spacing: u32,

        #[arg(long, value_enum, default_value = "nearest")]
        mode: RoundingArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoundingArg {
    Floor,
    Ceil,
    Nearest,
}

impl From<RoundingArg> for TickRounding {
    fn from(arg: RoundingArg) -> Self {
        match arg {
            RoundingArg::Floor => TickRounding::Floor,
            RoundingArg::Ceil => TickRounding::Ceil,
            RoundingArg::Nearest => TickRounding::Nearest,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BaseArg {
    AssetA,
    AssetB,
}

impl From<BaseArg> for PricingBase {
    fn from(arg: BaseArg) -> Self {
        match arg {
            BaseArg::AssetA => PricingBase::AssetA,
            BaseArg::AssetB => PricingBase::AssetB,
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("amm_gateway=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json)?;

    let result = match cli.command {
        Commands::Curve {
            supply,
            target_raise,
            graduation_pct,
        } => commands::curve(supply, target_raise, graduation_pct),
        Commands::Tick { action } => match action {
            TickAction::ToPrice { tick } => commands::tick_to_price(tick),
            TickAction::FromPrice { price } => commands::tick_from_price(&price),
            TickAction::Round {
                tick,
                spacing,
                mode,
            } => commands::tick_round(tick, spacing, mode.into()),
        },
        Commands::Range {
            lower,
            upper,
            spacing,
            decimals_a,
            decimals_b,
            base,
        } => commands::range(
            lower,
            upper,
            spacing,
            AssetDecimals {
                asset_a: decimals_a,
                asset_b: decimals_b,
            },
            base.into(),
        ),
        Commands::Classify { code } => commands::classify(&code, cli.json),
        Commands::Health => match Config::load(&cli.config) {
            Ok(config) => commands::health(&config).await,
            Err(e) => Err(e),
        },
        Commands::Config => match Config::load(&cli.config) {
            Ok(config) => commands::show_config(&config),
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
