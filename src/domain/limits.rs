//! Numeric constants and protocol limits.
//!
//! The constants are the defaults of the external contract. Deployments may
//! tighten or relax them through configuration, which produces a
//! [`ProtocolLimits`].

use alloy_primitives::U256;

use super::tree::FactorBounds;
use super::wad::{from_u128, WAD_RAW};

/// Maximum number of bins in a market.
pub const MAX_TICK_COUNT: usize = 1_000_000;

/// Smallest liquidity parameter `alpha` (0.001).
pub const MIN_LIQUIDITY_PARAMETER: U256 = from_u128(WAD_RAW / 1_000);

/// Largest liquidity parameter `alpha` (1,000,000).
pub const MAX_LIQUIDITY_PARAMETER: U256 = from_u128(WAD_RAW * 1_000_000);

/// Smallest multiplier a single chunk may apply (0.0001).
pub const MIN_FACTOR: U256 = from_u128(WAD_RAW / 10_000);

/// Largest multiplier a single chunk may apply (10,000).
pub const MAX_FACTOR: U256 = from_u128(WAD_RAW * 10_000);

/// Upper bound on chunks one trade may be split into.
pub const MAX_CHUNKS_PER_TX: usize = 100;

/// Seconds after the settlement timestamp during which oracle candidates
/// are accepted.
pub const SUBMIT_WINDOW: u64 = 300;

/// Seconds after the settlement timestamp before payouts may be claimed.
pub const FINALIZE_DEADLINE: u64 = 900;

/// Limits the core enforces, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolLimits {
    pub max_tick_count: usize,
    pub min_liquidity: U256,
    pub max_liquidity: U256,
    pub factor_bounds: FactorBounds,
    pub max_chunks_per_tx: usize,
    pub submit_window_secs: u64,
    pub finalize_deadline_secs: u64,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_tick_count: MAX_TICK_COUNT,
            min_liquidity: MIN_LIQUIDITY_PARAMETER,
            max_liquidity: MAX_LIQUIDITY_PARAMETER,
            factor_bounds: FactorBounds::new(MIN_FACTOR, MAX_FACTOR),
            max_chunks_per_tx: MAX_CHUNKS_PER_TX,
            submit_window_secs: SUBMIT_WINDOW,
            finalize_deadline_secs: FINALIZE_DEADLINE,
        }
    }
}
