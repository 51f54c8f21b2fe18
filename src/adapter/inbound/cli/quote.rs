//! Handler for `quote`.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::command::QuoteArgs;
use super::{load_config, output};
use crate::adapter::outbound::ManualClock;
use crate::domain::{money, wad, MarketError, MarketParams};
use crate::error::Result;
use crate::infrastructure::bootstrap::build_in_memory;

#[derive(Debug, Serialize)]
struct QuoteReport {
    bins: usize,
    lower: i64,
    upper: i64,
    quantity: Decimal,
    cost: Decimal,
    cost_wad: String,
    average_price: Decimal,
    chunks: usize,
    range_sum_before: Decimal,
    range_sum_after: Decimal,
    total_sum_after: Decimal,
}

/// Execute `quote`.
pub fn execute(args: &QuoteArgs) -> Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    config.init_logging();

    let quantity = money::from_display(args.quantity).ok_or(MarketError::InvalidQuantity)?;
    let alpha = wad::from_decimal(args.alpha)?;

    let deployment = build_in_memory(&config, Arc::new(ManualClock::new(0)))?;
    let params = MarketParams {
        id: None,
        min_tick: args.min_tick,
        max_tick: args.max_tick,
        tick_spacing: args.tick_spacing,
        start_timestamp: 0,
        end_timestamp: 1,
        settlement_timestamp: None,
        alpha,
    };
    let core = &deployment.core;
    let market_id = core.create_market(&deployment.operator, &params)?;
    let quote = core.quote_open(market_id, args.lower, args.upper, quantity)?;
    let bins = core.get_market(market_id)?.num_bins;

    let cost = money::to_display(quote.amount);
    let report = QuoteReport {
        bins,
        lower: args.lower,
        upper: args.upper,
        quantity: money::to_display(quantity),
        cost,
        cost_wad: quote.cost_wad.to_string(),
        average_price: (cost / money::to_display(quantity)).round_dp(6),
        chunks: quote.steps.len(),
        range_sum_before: wad::to_decimal(quote.range_sum_before)?,
        range_sum_after: wad::to_decimal(quote.range_sum_after)?,
        total_sum_after: wad::to_decimal(quote.total_sum_after)?,
    };

    if output::is_json() {
        return output::json(&report);
    }
    output::section("Open Quote");
    output::field("Range", format!("[{}, {}]", report.lower, report.upper));
    output::field("Bins", report.bins);
    output::field("Quantity", report.quantity);
    output::field("Cost", report.cost);
    output::field("Avg price", report.average_price);
    output::field("Chunks", report.chunks);
    output::field(
        "Range sum",
        format!("{} -> {}", report.range_sum_before, report.range_sum_after),
    );
    output::field("Total sum", report.total_sum_after);
    Ok(())
}
