//! Handler for the `config` command group.

use rust_decimal::Decimal;
use serde::Serialize;

use super::command::ConfigPathArg;
use super::{load_config, output};
use crate::domain::wad;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct LimitsReport {
    valid: bool,
    max_tick_count: usize,
    min_liquidity_parameter: Decimal,
    max_liquidity_parameter: Decimal,
    min_factor: Decimal,
    max_factor: Decimal,
    max_chunks_per_tx: usize,
    submit_window_secs: u64,
    finalize_deadline_secs: u64,
    admins: usize,
    oracle_signer: Option<String>,
}

/// Execute `config validate`.
pub fn execute_validate(args: &ConfigPathArg) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let limits = config.limits()?;

    let report = LimitsReport {
        valid: true,
        max_tick_count: limits.max_tick_count,
        min_liquidity_parameter: wad::to_decimal(limits.min_liquidity)?,
        max_liquidity_parameter: wad::to_decimal(limits.max_liquidity)?,
        min_factor: wad::to_decimal(limits.factor_bounds.min)?,
        max_factor: wad::to_decimal(limits.factor_bounds.max)?,
        max_chunks_per_tx: limits.max_chunks_per_tx,
        submit_window_secs: limits.submit_window_secs,
        finalize_deadline_secs: limits.finalize_deadline_secs,
        admins: config.access.admins.len(),
        oracle_signer: config.oracle.signer.map(|a| a.to_string()),
    };

    if output::is_json() {
        return output::json(&report);
    }
    output::success("Configuration is valid");
    output::section("Protocol");
    output::field("Max ticks", report.max_tick_count);
    output::field(
        "Alpha range",
        format!("[{}, {}]", report.min_liquidity_parameter, report.max_liquidity_parameter),
    );
    output::field(
        "Factor range",
        format!("[{}, {}]", report.min_factor, report.max_factor),
    );
    output::field("Max chunks", report.max_chunks_per_tx);
    output::field("Submit window", format!("{}s", report.submit_window_secs));
    output::field("Claim delay", format!("{}s", report.finalize_deadline_secs));
    output::section("Access");
    output::field("Admins", report.admins);
    output::field(
        "Oracle signer",
        report.oracle_signer.as_deref().unwrap_or("(not set)"),
    );
    Ok(())
}
