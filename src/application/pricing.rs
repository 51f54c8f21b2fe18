//! Trade pricing with chunked factor planning.
//!
//! Buying `q` of a range multiplies every bin in it by `exp(q / alpha)`;
//! selling multiplies by `exp(-q / alpha)`. The cost is
//! `alpha · ln(total_after / total_before)`. A single factor must stay
//! inside the configured factor bounds, so large trades are split into
//! the smallest number of chunks whose factors all fit.
//!
//! The quote produced here is the only source of truth for a trade: the
//! preview returns it and execution applies its factors and charges its
//! amount, so the two cannot diverge.

use alloy_primitives::U256;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::{MarketError, MathError};
use crate::domain::tree::FactorBounds;
use crate::domain::wad::{self, MAX_EXP_INPUT, WAD};
use crate::domain::{Amount, LazyRangeTree, ProtocolLimits, Quantity};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// One range multiply of a planned trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkStep {
    pub quantity: Quantity,
    pub factor: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeQuote {
    pub direction: TradeDirection,
    pub steps: Vec<ChunkStep>,
    /// Exact cost or proceeds (WAD).
    pub cost_wad: U256,
    /// `cost_wad` as 6 decimals: rounded up for buys, down for sells.
    pub amount: Amount,
    pub range_sum_before: U256,
    pub range_sum_after: U256,
    pub total_sum_before: U256,
    pub total_sum_after: U256,
}

impl TradeQuote {
    /// Apply every step to `[lo, hi]`. Callers wrap this in
    /// [`LazyRangeTree::atomically`] so a failing step rolls back.
    pub fn apply(&self, tree: &mut LazyRangeTree, lo: usize, hi: usize) -> Result<()> {
        for step in &self.steps {
            tree.apply_range_factor(lo, hi, step.factor)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    bounds: FactorBounds,
    max_chunks: usize,
    /// Largest `q / alpha` one chunk may carry in either direction.
    max_chunk_input: U256,
}

impl PricingEngine {
    pub fn new(limits: &ProtocolLimits) -> std::result::Result<Self, MathError> {
        let bounds = limits.factor_bounds;
        let buy_limit = wad::ln_unsigned(bounds.max)?;
        let sell_limit = wad::ln_unsigned(wad::div(WAD, bounds.min)?)?;
        let max_chunk_input = buy_limit.min(sell_limit).min(MAX_EXP_INPUT);
        if max_chunk_input.is_zero() {
            return Err(MathError::InvalidInput {
                reason: "factor bounds leave no room around 1.0",
                value: format!("[{}, {}]", bounds.min, bounds.max),
            });
        }
        Ok(Self {
            bounds,
            max_chunks: limits.max_chunks_per_tx,
            max_chunk_input,
        })
    }

    #[must_use]
    pub const fn max_chunk_input(&self) -> U256 {
        self.max_chunk_input
    }

    /// Price `quantity` against a range currently summing to `range_sum`
    /// inside a market whose bins sum to `total_sum`.
    pub fn quote(
        &self,
        alpha: U256,
        total_sum: U256,
        range_sum: U256,
        quantity: Quantity,
        direction: TradeDirection,
    ) -> Result<TradeQuote> {
        if quantity == 0 {
            return Err(MarketError::InvalidQuantity.into());
        }
        let input = wad::div(wad::to_wad(quantity), alpha)?;
        let min_chunks = ceil_div(input, self.max_chunk_input).max(U256::from(1));
        if min_chunks > U256::from(self.max_chunks) {
            return Err(MarketError::ChunkLimitExceeded {
                required: u128::try_from(min_chunks).unwrap_or(u128::MAX),
                limit: self.max_chunks,
            }
            .into());
        }
        // min_chunks <= max_chunks, so it fits a usize
        let first = usize::try_from(min_chunks).unwrap_or(self.max_chunks);

        for chunks in first..=self.max_chunks {
            match self.plan(alpha, total_sum, range_sum, quantity, chunks, direction) {
                Ok(quote) => {
                    debug!(
                        chunks = quote.steps.len(),
                        quantity,
                        direction = ?direction,
                        cost_wad = %quote.cost_wad,
                        "Trade planned"
                    );
                    return Ok(quote);
                }
                Err(crate::error::Error::Market(MarketError::FactorOutOfBounds { factor, .. })) => {
                    debug!(chunks, factor = %factor, "Chunk factor out of bounds, splitting further");
                }
                Err(e) => return Err(e),
            }
        }
        Err(MarketError::ChunkLimitExceeded {
            required: self.max_chunks as u128 + 1,
            limit: self.max_chunks,
        }
        .into())
    }

    fn plan(
        &self,
        alpha: U256,
        total_sum: U256,
        range_sum: U256,
        quantity: Quantity,
        chunks: usize,
        direction: TradeDirection,
    ) -> Result<TradeQuote> {
        let n = chunks as u128;
        let base = quantity / n;
        let remainder = quantity % n;

        let mut steps = Vec::with_capacity(chunks);
        let mut range = range_sum;
        let mut total = total_sum;
        let mut cost_wad = U256::ZERO;

        for i in 0..n {
            let step_quantity = base + u128::from(i < remainder);
            if step_quantity == 0 {
                continue;
            }
            let growth = wad::exp(wad::div(wad::to_wad(step_quantity), alpha)?)?;
            let factor = match direction {
                TradeDirection::Buy => growth,
                TradeDirection::Sell => wad::div(WAD, growth)?,
            };
            if !self.bounds.contains(factor) {
                return Err(MarketError::FactorOutOfBounds {
                    factor,
                    min: self.bounds.min,
                    max: self.bounds.max,
                }
                .into());
            }

            let next_range = wad::mul(range, factor)?;
            let next_total = wad::add(wad::sub(total, range)?, next_range)?;
            cost_wad = wad::add(cost_wad, wad::cost(alpha, total, next_total)?)?;

            steps.push(ChunkStep {
                quantity: step_quantity,
                factor,
            });
            range = next_range;
            total = next_total;
        }

        let amount = match direction {
            TradeDirection::Buy => wad::from_wad_round_up(cost_wad)?,
            TradeDirection::Sell => wad::from_wad(cost_wad)?,
        };

        Ok(TradeQuote {
            direction,
            steps,
            cost_wad,
            amount,
            range_sum_before: range_sum,
            range_sum_after: range,
            total_sum_before: total_sum,
            total_sum_after: total,
        })
    }
}

fn ceil_div(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        quotient
    } else {
        quotient + U256::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const UNIT: u128 = 1_000_000;

    fn engine() -> PricingEngine {
        PricingEngine::new(&ProtocolLimits::default()).unwrap()
    }

    fn ten_bins() -> (U256, U256) {
        (WAD * U256::from(10), WAD)
    }

    #[test]
    fn buy_cost_matches_closed_form() {
        let (total, range) = ten_bins();
        let quote = engine()
            .quote(WAD, total, range, UNIT, TradeDirection::Buy)
            .unwrap();
        assert_eq!(quote.steps.len(), 1);

        // ln((9 + e) / 10) = 0.158...
        let expected = wad::cost(WAD, total, quote.total_sum_after).unwrap();
        assert_eq!(quote.cost_wad, expected);
        assert!(quote.cost_wad > U256::from(158_000_000_000_000_000u128));
        assert!(quote.cost_wad < U256::from(159_000_000_000_000_000u128));
        assert_eq!(quote.amount, wad::from_wad_round_up(quote.cost_wad).unwrap());
    }

    #[test]
    fn sell_is_rounded_down() {
        let (total, range) = ten_bins();
        let quote = engine()
            .quote(WAD, total, range, UNIT, TradeDirection::Sell)
            .unwrap();
        assert!(quote.range_sum_after < range);
        assert!(quote.total_sum_after < total);
        assert_eq!(quote.amount, wad::from_wad(quote.cost_wad).unwrap());
    }

    #[test]
    fn buy_then_sell_returns_at_most_the_cost() {
        let (total, range) = ten_bins();
        let engine = engine();
        let buy = engine
            .quote(WAD, total, range, 3 * UNIT, TradeDirection::Buy)
            .unwrap();
        let sell = engine
            .quote(
                WAD,
                buy.total_sum_after,
                buy.range_sum_after,
                3 * UNIT,
                TradeDirection::Sell,
            )
            .unwrap();
        assert!(sell.amount <= buy.amount);
        assert!(buy.amount - sell.amount <= 1);
    }

    #[test]
    fn large_trades_are_chunked() {
        let (total, range) = ten_bins();
        let quote = engine()
            .quote(WAD, total, range, 20 * UNIT, TradeDirection::Buy)
            .unwrap();
        assert_eq!(quote.steps.len(), 3);
        let quantities: Vec<u128> = quote.steps.iter().map(|s| s.quantity).collect();
        assert_eq!(quantities, vec![6_666_667, 6_666_667, 6_666_666]);
        assert!(quote
            .steps
            .iter()
            .all(|s| ProtocolLimits::default().factor_bounds.contains(s.factor)));
    }

    #[test]
    fn higher_alpha_is_cheaper() {
        let (total, range) = ten_bins();
        let engine = engine();
        let deep = engine
            .quote(WAD * U256::from(100), total, range, UNIT, TradeDirection::Buy)
            .unwrap();
        let shallow = engine
            .quote(WAD / U256::from(10), total, range, UNIT, TradeDirection::Buy)
            .unwrap();
        assert!(deep.cost_wad < shallow.cost_wad);
    }

    #[test]
    fn chunk_limit_is_enforced() {
        let (total, range) = ten_bins();
        let err = engine()
            .quote(WAD / U256::from(1_000), total, range, UNIT, TradeDirection::Buy)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Market(MarketError::ChunkLimitExceeded {
                required: 109,
                limit: 100
            })
        ));
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let (total, range) = ten_bins();
        assert!(matches!(
            engine().quote(WAD, total, range, 0, TradeDirection::Buy),
            Err(Error::Market(MarketError::InvalidQuantity))
        ));
    }

    #[test]
    fn apply_reproduces_projected_range() {
        let mut tree = LazyRangeTree::new();
        tree.init(10).unwrap();
        let quote = engine()
            .quote(WAD, WAD * U256::from(10), WAD * U256::from(2), 2 * UNIT, TradeDirection::Buy)
            .unwrap();
        quote.apply(&mut tree, 3, 4).unwrap();
        let after = tree.get_range_sum(3, 4).unwrap();
        let diff = if after > quote.range_sum_after {
            after - quote.range_sum_after
        } else {
            quote.range_sum_after - after
        };
        assert!(diff <= U256::from(2));
    }
}
