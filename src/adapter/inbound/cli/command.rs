//! Command-line interface definitions.
//!
//! Defines the `clmsr` CLI using `clap`: trade quoting against a fresh
//! market, scenario replay, oracle payload signing and config validation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// CLMSR market maker toolkit
#[derive(Parser, Debug)]
#[command(name = "clmsr")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Quote the cost of opening a range position on a fresh market
    Quote(QuoteArgs),

    /// Replay a scenario file of trades against a fresh market
    Simulate(SimulateArgs),

    /// Sign a settlement payload with ORACLE_PRIVATE_KEY
    SignSettlement(SignSettlementArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Commands {
    /// Command name as typed on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Simulate(_) => "simulate",
            Self::SignSettlement(_) => "sign-settlement",
            Self::Config(ConfigCommand::Validate(_)) => "config validate",
        }
    }
}

/// Path to a configuration file.
#[derive(Args, Debug, Clone)]
pub struct ConfigPathArg {
    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    #[arg(long, allow_hyphen_values = true)]
    pub min_tick: i64,

    #[arg(long, allow_hyphen_values = true)]
    pub max_tick: i64,

    #[arg(long)]
    pub tick_spacing: i64,

    /// Liquidity parameter in units of 1.0
    #[arg(long)]
    pub alpha: Decimal,

    /// Lower tick of the range (inclusive)
    #[arg(long, allow_hyphen_values = true)]
    pub lower: i64,

    /// Upper tick of the range (inclusive)
    #[arg(long, allow_hyphen_values = true)]
    pub upper: i64,

    /// Quantity in payment units (6 decimals)
    #[arg(long)]
    pub quantity: Decimal,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Scenario TOML file
    pub scenario: PathBuf,
}

#[derive(Args, Debug)]
pub struct SignSettlementArgs {
    #[arg(long)]
    pub market_id: u64,

    /// Settlement value (tick units)
    #[arg(long, allow_hyphen_values = true)]
    pub value: i64,

    /// Unix timestamp of the price sample
    #[arg(long)]
    pub price_timestamp: u64,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file and show the resolved limits
    Validate(ConfigPathArg),
}
