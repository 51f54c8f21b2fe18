//! Protocol limits as configured in human units.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::limits::{self, ProtocolLimits};
use crate::domain::tree::{FactorBounds, MAX_TREE_SIZE};
use crate::domain::wad::{self, WAD};
use crate::error::{ConfigError, Result};

/// `[protocol]` section. Decimal fields are in units of 1.0, not WAD.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub max_tick_count: usize,
    pub min_liquidity_parameter: Decimal,
    pub max_liquidity_parameter: Decimal,
    pub min_factor: Decimal,
    pub max_factor: Decimal,
    pub max_chunks_per_tx: usize,
    pub submit_window_secs: u64,
    pub finalize_deadline_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_tick_count: limits::MAX_TICK_COUNT,
            min_liquidity_parameter: Decimal::new(1, 3),
            max_liquidity_parameter: Decimal::from(1_000_000),
            min_factor: Decimal::new(1, 4),
            max_factor: Decimal::from(10_000),
            max_chunks_per_tx: limits::MAX_CHUNKS_PER_TX,
            submit_window_secs: limits::SUBMIT_WINDOW,
            finalize_deadline_secs: limits::FINALIZE_DEADLINE,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
    .into()
}

fn to_wad(field: &'static str, value: Decimal) -> Result<U256> {
    if value <= Decimal::ZERO {
        return Err(invalid(field, "must be greater than 0"));
    }
    wad::from_decimal(value).map_err(|e| invalid(field, e.to_string()))
}

impl ProtocolConfig {
    /// Validate and convert to the limits the core enforces.
    pub fn limits(&self) -> Result<ProtocolLimits> {
        if self.max_tick_count == 0 || self.max_tick_count > MAX_TREE_SIZE {
            return Err(invalid(
                "protocol.max_tick_count",
                format!("must be between 1 and {MAX_TREE_SIZE}"),
            ));
        }
        let min_liquidity = to_wad("protocol.min_liquidity_parameter", self.min_liquidity_parameter)?;
        let max_liquidity = to_wad("protocol.max_liquidity_parameter", self.max_liquidity_parameter)?;
        if min_liquidity > max_liquidity {
            return Err(invalid(
                "protocol.max_liquidity_parameter",
                "must be >= min_liquidity_parameter",
            ));
        }
        let min_factor = to_wad("protocol.min_factor", self.min_factor)?;
        if min_factor >= WAD {
            return Err(invalid("protocol.min_factor", "must be below 1"));
        }
        let max_factor = to_wad("protocol.max_factor", self.max_factor)?;
        if max_factor <= WAD {
            return Err(invalid("protocol.max_factor", "must be above 1"));
        }
        if self.max_chunks_per_tx == 0 {
            return Err(invalid("protocol.max_chunks_per_tx", "must be greater than 0"));
        }
        if self.submit_window_secs == 0 {
            return Err(invalid("protocol.submit_window_secs", "must be greater than 0"));
        }
        if self.finalize_deadline_secs < self.submit_window_secs {
            return Err(invalid(
                "protocol.finalize_deadline_secs",
                "must be >= submit_window_secs",
            ));
        }

        Ok(ProtocolLimits {
            max_tick_count: self.max_tick_count,
            min_liquidity,
            max_liquidity,
            factor_bounds: FactorBounds::new(min_factor, max_factor),
            max_chunks_per_tx: self.max_chunks_per_tx,
            submit_window_secs: self.submit_window_secs,
            finalize_deadline_secs: self.finalize_deadline_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_protocol_constants() {
        assert_eq!(ProtocolConfig::default().limits().unwrap(), ProtocolLimits::default());
    }

    #[test]
    fn factor_bounds_must_straddle_one() {
        let config = ProtocolConfig {
            min_factor: dec!(1),
            ..ProtocolConfig::default()
        };
        let err = config.limits().unwrap_err();
        assert!(err.to_string().contains("protocol.min_factor"));
    }

    #[test]
    fn deadline_cannot_precede_window() {
        let config = ProtocolConfig {
            submit_window_secs: 600,
            finalize_deadline_secs: 300,
            ..ProtocolConfig::default()
        };
        assert!(config.limits().is_err());
    }
}
