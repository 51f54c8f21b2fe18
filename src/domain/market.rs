//! Markets: tick layout, lifecycle timestamps and the per-market tree.
//!
//! A market partitions `[min_tick, max_tick]` into bins of width
//! `tick_spacing`. Bin `i` covers tick `min_tick + i * tick_spacing`, and
//! each bin owns one leaf of the market's [`LazyRangeTree`].

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::error::MarketError;
use super::ids::MarketId;
use super::limits::ProtocolLimits;
use super::settlement::SettlementCandidate;
use super::tree::{LazyRangeTree, MAX_TREE_SIZE};
use crate::error::Result;

/// Parameters for creating a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Explicit id; the core assigns the next free id when `None`.
    pub id: Option<MarketId>,
    pub min_tick: i64,
    pub max_tick: i64,
    pub tick_spacing: i64,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    /// Target time for oracle samples. Falls back to `end_timestamp`.
    pub settlement_timestamp: Option<u64>,
    /// Liquidity parameter (WAD).
    pub alpha: U256,
}

/// Where a market is in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    Created,
    Active,
    Ended,
    CandidateSubmission,
    Finalized,
    ClaimOpen,
}

/// Read-only snapshot returned by `get_market`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketView {
    pub id: MarketId,
    pub min_tick: i64,
    pub max_tick: i64,
    pub tick_spacing: i64,
    pub num_bins: usize,
    pub alpha: U256,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub settlement_timestamp: Option<u64>,
    pub is_active: bool,
    pub settled: bool,
    pub settlement_value: Option<i64>,
    pub settlement_tick: Option<i64>,
    pub candidate: Option<SettlementCandidate>,
    pub total_sum: U256,
    pub phase: MarketPhase,
}

#[derive(Debug, Clone)]
pub struct Market {
    id: MarketId,
    min_tick: i64,
    max_tick: i64,
    tick_spacing: i64,
    num_bins: usize,
    alpha: U256,
    start_timestamp: u64,
    end_timestamp: u64,
    settlement_timestamp: Option<u64>,
    is_active: bool,
    settled: bool,
    settlement_value: Option<i64>,
    settlement_tick: Option<i64>,
    candidate: Option<SettlementCandidate>,
    tree: LazyRangeTree,
}

impl Market {
    /// Validate `params` against `limits` and build a market whose bins all
    /// start at weight `WAD`.
    pub fn try_new(id: MarketId, params: &MarketParams, limits: &ProtocolLimits) -> Result<Self> {
        if params.alpha < limits.min_liquidity || params.alpha > limits.max_liquidity {
            return Err(MarketError::LiquidityParameterOutOfRange {
                alpha: params.alpha,
                min: limits.min_liquidity,
                max: limits.max_liquidity,
            }
            .into());
        }
        let num_bins = bin_count(params, limits)?;

        let settles_before_end = params
            .settlement_timestamp
            .is_some_and(|settlement| settlement < params.end_timestamp);
        if params.start_timestamp >= params.end_timestamp || settles_before_end {
            return Err(MarketError::InvalidTimeRange {
                start: params.start_timestamp,
                end: params.end_timestamp,
                settlement: params.settlement_timestamp,
            }
            .into());
        }

        let mut tree = LazyRangeTree::with_bounds(limits.factor_bounds);
        tree.init(num_bins)?;

        Ok(Self {
            id,
            min_tick: params.min_tick,
            max_tick: params.max_tick,
            tick_spacing: params.tick_spacing,
            num_bins,
            alpha: params.alpha,
            start_timestamp: params.start_timestamp,
            end_timestamp: params.end_timestamp,
            settlement_timestamp: params.settlement_timestamp,
            is_active: true,
            settled: false,
            settlement_value: None,
            settlement_tick: None,
            candidate: None,
            tree,
        })
    }

    #[must_use]
    pub const fn id(&self) -> MarketId {
        self.id
    }

    #[must_use]
    pub const fn alpha(&self) -> U256 {
        self.alpha
    }

    #[must_use]
    pub const fn min_tick(&self) -> i64 {
        self.min_tick
    }

    #[must_use]
    pub const fn max_tick(&self) -> i64 {
        self.max_tick
    }

    #[must_use]
    pub const fn tick_spacing(&self) -> i64 {
        self.tick_spacing
    }

    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[must_use]
    pub const fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    #[must_use]
    pub const fn end_timestamp(&self) -> u64 {
        self.end_timestamp
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.settled
    }

    #[must_use]
    pub const fn settlement_value(&self) -> Option<i64> {
        self.settlement_value
    }

    /// Winning tick, once settled.
    #[must_use]
    pub const fn settled_tick(&self) -> Option<i64> {
        self.settlement_tick
    }

    #[must_use]
    pub const fn candidate(&self) -> Option<SettlementCandidate> {
        self.candidate
    }

    pub fn set_candidate(&mut self, candidate: SettlementCandidate) {
        self.candidate = Some(candidate);
    }

    #[must_use]
    pub const fn tree(&self) -> &LazyRangeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LazyRangeTree {
        &mut self.tree
    }

    /// Timestamp oracle samples are measured against.
    #[must_use]
    pub fn settlement_reference(&self) -> u64 {
        self.settlement_timestamp.unwrap_or(self.end_timestamp)
    }

    /// First instant at which payouts may be claimed, `finalize_deadline_secs`
    /// after the settlement reference.
    #[must_use]
    pub fn claim_open_timestamp(&self, finalize_deadline_secs: u64) -> u64 {
        self.settlement_reference()
            .saturating_add(finalize_deadline_secs)
    }

    /// Bin holding `tick`.
    pub fn bin_index(&self, tick: i64) -> std::result::Result<usize, MarketError> {
        if tick < self.min_tick || tick > self.max_tick {
            return Err(MarketError::InvalidTick {
                tick,
                min: self.min_tick,
                max: self.max_tick,
            });
        }
        let offset = i128::from(tick) - i128::from(self.min_tick);
        let spacing = i128::from(self.tick_spacing);
        if offset % spacing != 0 {
            return Err(MarketError::TickNotAligned {
                tick,
                spacing: self.tick_spacing,
                min: self.min_tick,
            });
        }
        // offset / spacing < num_bins <= MAX_TREE_SIZE
        Ok(usize::try_from(offset / spacing).unwrap_or(usize::MAX))
    }

    /// Inclusive bin range for the tick range `[lower, upper]`.
    pub fn range_bins(
        &self,
        lower: i64,
        upper: i64,
    ) -> std::result::Result<(usize, usize), MarketError> {
        if lower > upper {
            return Err(MarketError::InvalidTickRange { lower, upper });
        }
        Ok((self.bin_index(lower)?, self.bin_index(upper)?))
    }

    /// Clamp `value` into the tick range and align it down to the grid.
    #[must_use]
    pub fn settlement_tick_for(&self, value: i64) -> i64 {
        let clamped = value.clamp(self.min_tick, self.max_tick);
        let steps = (i128::from(clamped) - i128::from(self.min_tick)) / i128::from(self.tick_spacing);
        let tick = i128::from(self.min_tick) + steps * i128::from(self.tick_spacing);
        // tick lies in [min_tick, clamped]
        i64::try_from(tick).unwrap_or(clamped)
    }

    /// Tick of the middle bin (lower middle for an even count).
    #[must_use]
    pub fn midpoint_tick(&self) -> i64 {
        let middle = i128::try_from((self.num_bins - 1) / 2).unwrap_or(0);
        let tick = i128::from(self.min_tick) + middle * i128::from(self.tick_spacing);
        i64::try_from(tick).unwrap_or(self.min_tick)
    }

    /// Commit the final value. Clears any retained candidate.
    pub fn settle(&mut self, value: i64) -> std::result::Result<i64, MarketError> {
        if self.settled {
            return Err(MarketError::MarketAlreadySettled(self.id));
        }
        let tick = self.settlement_tick_for(value);
        self.settled = true;
        self.is_active = false;
        self.settlement_value = Some(value);
        self.settlement_tick = Some(tick);
        self.candidate = None;
        Ok(tick)
    }

    #[must_use]
    pub fn phase(&self, now: u64, limits: &ProtocolLimits) -> MarketPhase {
        if self.settled {
            if now >= self.claim_open_timestamp(limits.finalize_deadline_secs) {
                MarketPhase::ClaimOpen
            } else {
                MarketPhase::Finalized
            }
        } else if now < self.start_timestamp {
            MarketPhase::Created
        } else if now < self.end_timestamp {
            MarketPhase::Active
        } else if now < self.settlement_reference() {
            MarketPhase::Ended
        } else {
            MarketPhase::CandidateSubmission
        }
    }

    #[must_use]
    pub fn view(&self, now: u64, limits: &ProtocolLimits) -> MarketView {
        MarketView {
            id: self.id,
            min_tick: self.min_tick,
            max_tick: self.max_tick,
            tick_spacing: self.tick_spacing,
            num_bins: self.num_bins,
            alpha: self.alpha,
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            settlement_timestamp: self.settlement_timestamp,
            is_active: self.is_active,
            settled: self.settled,
            settlement_value: self.settlement_value,
            settlement_tick: self.settlement_tick,
            candidate: self.candidate,
            total_sum: self.tree.get_total_sum().unwrap_or_default(),
            phase: self.phase(now, limits),
        }
    }
}

fn bin_count(params: &MarketParams, limits: &ProtocolLimits) -> std::result::Result<usize, MarketError> {
    if params.min_tick > params.max_tick {
        return Err(MarketError::InvalidTickRange {
            lower: params.min_tick,
            upper: params.max_tick,
        });
    }
    let width = i128::from(params.max_tick) - i128::from(params.min_tick);
    let spacing = i128::from(params.tick_spacing);
    if spacing <= 0 || width == 0 || width % spacing != 0 {
        return Err(MarketError::InvalidTickSpacing {
            spacing: params.tick_spacing,
            min: params.min_tick,
            max: params.max_tick,
        });
    }
    let max = limits.max_tick_count.min(MAX_TREE_SIZE);
    // width > 0 and spacing > 0, so count >= 2
    let count = u128::try_from(width / spacing + 1).unwrap_or(u128::MAX);
    match usize::try_from(count) {
        Ok(bins) if bins <= max => Ok(bins),
        _ => Err(MarketError::TickCountOutOfRange { count, max }),
    }
}
