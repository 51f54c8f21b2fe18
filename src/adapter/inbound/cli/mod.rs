//! CLI module graph.

pub mod command;
pub mod config;
pub mod output;
pub mod quote;
pub mod sign;
pub mod simulate;

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::settings::Config;

use command::{Cli, Commands, ConfigCommand};

/// Load `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::parse_toml(""),
    }
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
    });
    match cli.command {
        Commands::Quote(args) => quote::execute(&args),
        Commands::Simulate(args) => simulate::execute(&args),
        Commands::SignSettlement(args) => sign::execute(&args),
        Commands::Config(ConfigCommand::Validate(args)) => config::execute_validate(&args),
    }
}
