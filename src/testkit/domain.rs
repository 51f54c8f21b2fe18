//! Builders for domain primitives used across tests.

use alloy_primitives::U256;

use crate::domain::wad::WAD;
use crate::domain::MarketParams;

/// One unit of quantity or payment (6 decimals).
pub const UNIT: u128 = 1_000_000;

/// Default trading window for test markets.
pub const START: u64 = 1_000;
pub const END: u64 = 10_000;

/// A market over `[min_tick, max_tick]` with `alpha` given in whole units,
/// trading during `[START, END)`.
pub fn market_params(min_tick: i64, max_tick: i64, tick_spacing: i64, alpha: u64) -> MarketParams {
    MarketParams {
        id: None,
        min_tick,
        max_tick,
        tick_spacing,
        start_timestamp: START,
        end_timestamp: END,
        settlement_timestamp: None,
        alpha: WAD * U256::from(alpha),
    }
}

/// Ten bins of width 10 over `[0, 90]` with `alpha = 1`.
pub fn ten_bin_market() -> MarketParams {
    market_params(0, 90, 10, 1)
}
