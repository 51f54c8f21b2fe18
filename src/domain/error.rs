//! Domain errors for the pricing and settlement core.
//!
//! Each enum covers one layer: fixed-point arithmetic, the range tree,
//! market/trade validation and settlement gating. Variants carry the
//! offending value together with the bound it violated so callers never
//! have to guess why an operation was rejected.
//!
//! # Examples
//!
//! ```
//! use clmsr::domain::error::MathError;
//! use clmsr::domain::wad::{self, WAD};
//! use alloy_primitives::U256;
//!
//! let result = wad::div(WAD, U256::ZERO);
//! assert!(matches!(result, Err(MathError::DivisionByZero)));
//! ```

use alloy_primitives::U256;
use thiserror::Error;

use super::ids::{MarketId, PositionId};

/// Errors raised by WAD fixed-point arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// Divisor was zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Input outside the function's domain (e.g. `ln(0)`).
    #[error("invalid input {value}: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: &'static str,
        /// The rejected value, rendered in WAD units.
        value: String,
    },

    /// Reduction over an empty slice.
    #[error("empty array")]
    EmptyArray,

    /// Result does not fit the target width.
    #[error("arithmetic overflow in {op}")]
    Overflow {
        /// Operation that overflowed.
        op: &'static str,
    },

    /// Subtraction went below zero.
    #[error("arithmetic underflow in {op}")]
    Underflow {
        /// Operation that underflowed.
        op: &'static str,
    },

    /// `exp` input above the representable domain.
    #[error("exp input {input} exceeds maximum {max}")]
    ExpInputTooLarge {
        /// The rejected exponent (WAD).
        input: U256,
        /// Largest accepted exponent (WAD).
        max: U256,
    },
}

/// Errors raised by [`LazyRangeTree`](super::tree::LazyRangeTree).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree size must be non-zero")]
    TreeSizeZero,

    #[error("tree size {size} exceeds maximum {max}")]
    TreeSizeTooLarge { size: usize, max: usize },

    #[error("tree already initialized")]
    TreeAlreadyInitialized,

    #[error("tree not initialized")]
    TreeNotInitialized,

    #[error("index {index} out of bounds for tree of size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("invalid range [{lo}, {hi}]")]
    InvalidRange { lo: usize, hi: usize },

    #[error("factor {factor} outside [{min}, {max}]")]
    InvalidFactor { factor: U256, min: U256, max: U256 },

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Validation and state errors for markets, trades and positions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("invalid tick range: lower {lower} > upper {upper}")]
    InvalidTickRange { lower: i64, upper: i64 },

    #[error("tick {tick} outside [{min}, {max}]")]
    InvalidTick { tick: i64, min: i64, max: i64 },

    #[error("tick {tick} not aligned to spacing {spacing} from {min}")]
    TickNotAligned { tick: i64, spacing: i64, min: i64 },

    #[error("invalid tick spacing {spacing} for range [{min}, {max}]")]
    InvalidTickSpacing { spacing: i64, min: i64, max: i64 },

    #[error("tick count {count} outside [1, {max}]")]
    TickCountOutOfRange { count: u128, max: usize },

    #[error("liquidity parameter {alpha} outside [{min}, {max}]")]
    LiquidityParameterOutOfRange { alpha: U256, min: U256, max: U256 },

    #[error("invalid time range: start {start}, end {end}, settlement {settlement:?}")]
    InvalidTimeRange {
        start: u64,
        end: u64,
        settlement: Option<u64>,
    },

    #[error("quantity must be non-zero")]
    InvalidQuantity,

    #[error("array length mismatch: lowers {lowers}, uppers {uppers}, factors {factors}")]
    ArrayLengthMismatch {
        lowers: usize,
        uppers: usize,
        factors: usize,
    },

    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("market {0} already exists")]
    MarketAlreadyExists(MarketId),

    #[error("core is paused")]
    Paused,

    #[error("core is already paused")]
    AlreadyPaused,

    #[error("core is not paused")]
    NotPaused,

    #[error("market {0} is not active")]
    MarketNotActive(MarketId),

    #[error("market opens at {start}, now {now}")]
    MarketNotStarted { start: u64, now: u64 },

    #[error("market ended at {end}, now {now}")]
    MarketExpired { end: u64, now: u64 },

    #[error("market {0} already settled")]
    MarketAlreadySettled(MarketId),

    #[error("market {0} not settled")]
    MarketNotSettled(MarketId),

    #[error("position {0} not found")]
    PositionNotFound(PositionId),

    #[error("position {0} is not owned by caller")]
    NotPositionOwner(PositionId),

    #[error("position {position} holds {available}, requested {requested}")]
    InsufficientPositionQuantity {
        position: PositionId,
        available: u128,
        requested: u128,
    },

    #[error("cost {cost} exceeds maximum {max}")]
    CostExceedsMaximum { cost: u128, max: u128 },

    #[error("proceeds {proceeds} below minimum {min}")]
    ProceedsBelowMinimum { proceeds: u128, min: u128 },

    #[error("trade needs {required} chunks, limit is {limit}")]
    ChunkLimitExceeded { required: u128, limit: usize },

    #[error("chunk factor {factor} outside [{min}, {max}]")]
    FactorOutOfBounds { factor: U256, min: U256, max: U256 },
}

/// Settlement timing and authenticity errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("settlement not open until {open_at}, now {now}")]
    SettlementTooEarly { open_at: u64, now: u64 },

    #[error("settlement submission window closed at {closed_at}, now {now}")]
    SettlementFinalizeWindowClosed { closed_at: u64, now: u64 },

    #[error("settlement submission window open until {closes_at}, now {now}")]
    SettlementWindowOpen { closes_at: u64, now: u64 },

    #[error("settlement payload not signed by the oracle signer")]
    SettlementOracleSignatureInvalid,

    #[error("no settlement candidate for market {0}")]
    SettlementCandidateMissing(MarketId),

    #[error("price timestamp {price_timestamp} is in the future (now {now})")]
    SettlementPriceFromFuture { price_timestamp: u64, now: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_error_wraps_math_error() {
        let err: TreeError = MathError::DivisionByZero.into();
        assert_eq!(err, TreeError::Math(MathError::DivisionByZero));
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn market_error_reports_bounds() {
        let err = MarketError::CostExceedsMaximum { cost: 12, max: 10 };
        assert_eq!(err.to_string(), "cost 12 exceeds maximum 10");
    }
}
