use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clmsr::adapter::inbound::cli::{self, command::Cli, output};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let name = cli.command.name();
    cli::run(cli).with_context(|| format!("{name} failed"))
}
