//! The market core: keyed market store plus every public operation.
//!
//! All operations run under one lock, so they are applied in a strict
//! total order. Each mutating operation either completes or leaves tree
//! sums, pending multipliers and market flags exactly as they were.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parking_lot::Mutex;
use tracing::{error, info};

use super::access::AccessControl;
use super::pricing::{PricingEngine, TradeDirection, TradeQuote};
use super::settlement::{SettlementMachine, Submission};
use crate::adapter::outbound::SystemClock;
use crate::domain::error::MathError;
use crate::domain::{
    Amount, Market, MarketError, MarketId, MarketParams, MarketView, Position, PositionId,
    Principal, ProtocolLimits, Quantity,
};
use crate::error::{ConfigError, Error, Result};
use crate::port::{Clock, PaymentCustody, PositionLedger};

struct CoreState {
    markets: BTreeMap<MarketId, Market>,
    next_market_id: u64,
    access: AccessControl,
    settlement: SettlementMachine,
}

impl CoreState {
    fn market(&self, id: MarketId) -> std::result::Result<&Market, MarketError> {
        self.markets.get(&id).ok_or(MarketError::MarketNotFound(id))
    }
}

fn market_mut(
    markets: &mut BTreeMap<MarketId, Market>,
    id: MarketId,
) -> std::result::Result<&mut Market, MarketError> {
    markets.get_mut(&id).ok_or(MarketError::MarketNotFound(id))
}

/// Trades need an open, unsettled, active market.
fn require_tradable(market: &Market, now: u64) -> std::result::Result<(), MarketError> {
    if market.is_settled() {
        return Err(MarketError::MarketAlreadySettled(market.id()));
    }
    if !market.is_active() {
        return Err(MarketError::MarketNotActive(market.id()));
    }
    if now < market.start_timestamp() {
        return Err(MarketError::MarketNotStarted {
            start: market.start_timestamp(),
            now,
        });
    }
    if now >= market.end_timestamp() {
        return Err(MarketError::MarketExpired {
            end: market.end_timestamp(),
            now,
        });
    }
    Ok(())
}

pub struct MarketCore {
    principal: Principal,
    limits: ProtocolLimits,
    pricing: PricingEngine,
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn PositionLedger>,
    custody: Arc<dyn PaymentCustody>,
    state: Mutex<CoreState>,
}

impl MarketCore {
    #[must_use]
    pub fn builder() -> MarketCoreBuilder {
        MarketCoreBuilder::default()
    }

    /// Identity the core presents to its collaborators.
    #[must_use]
    pub const fn principal(&self) -> Principal {
        self.principal
    }

    #[must_use]
    pub const fn limits(&self) -> &ProtocolLimits {
        &self.limits
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    // --- administration ---

    pub fn create_market(&self, caller: &Principal, params: &MarketParams) -> Result<MarketId> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;

        let id = match params.id {
            Some(id) if state.markets.contains_key(&id) => {
                return Err(MarketError::MarketAlreadyExists(id).into());
            }
            Some(id) => id,
            None => {
                let mut next = state.next_market_id;
                while state.markets.contains_key(&MarketId::new(next)) {
                    next += 1;
                }
                MarketId::new(next)
            }
        };

        let market = Market::try_new(id, params, &self.limits)?;
        info!(
            market_id = %id,
            min_tick = params.min_tick,
            max_tick = params.max_tick,
            tick_spacing = params.tick_spacing,
            bins = market.num_bins(),
            alpha = %params.alpha,
            "Market created"
        );
        state.markets.insert(id, market);
        state.next_market_id = state.next_market_id.max(id.value().saturating_add(1));
        Ok(id)
    }

    pub fn set_market_active(&self, caller: &Principal, id: MarketId, active: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;
        let market = market_mut(&mut state.markets, id)?;
        if market.is_settled() {
            return Err(MarketError::MarketAlreadySettled(id).into());
        }
        market.set_active(active);
        info!(market_id = %id, active, "Market activity changed");
        Ok(())
    }

    /// Seed a market's shape with independent range multiplies. Every entry
    /// is validated before any is applied.
    pub fn apply_range_factor_batch(
        &self,
        caller: &Principal,
        id: MarketId,
        lowers: &[i64],
        uppers: &[i64],
        factors: &[U256],
        context: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;
        if lowers.len() != uppers.len() || lowers.len() != factors.len() {
            return Err(MarketError::ArrayLengthMismatch {
                lowers: lowers.len(),
                uppers: uppers.len(),
                factors: factors.len(),
            }
            .into());
        }
        let market = market_mut(&mut state.markets, id)?;
        if market.is_settled() {
            return Err(MarketError::MarketAlreadySettled(id).into());
        }

        let mut entries = Vec::with_capacity(factors.len());
        for ((&lower, &upper), &factor) in lowers.iter().zip(uppers).zip(factors) {
            let (lo, hi) = market.range_bins(lower, upper)?;
            self.limits.factor_bounds.check(factor)?;
            entries.push((lo, hi, factor));
        }

        market.tree_mut().atomically(|tree| {
            for &(lo, hi, factor) in &entries {
                tree.apply_range_factor(lo, hi, factor)?;
            }
            Ok::<(), Error>(())
        })?;
        info!(market_id = %id, ranges = entries.len(), context, "Range factors applied");
        Ok(())
    }

    /// Fails with [`MarketError::AlreadyPaused`] if already paused.
    pub fn pause(&self, caller: &Principal) -> Result<()> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;
        state.access.pause()?;
        info!(by = %caller, "Core paused");
        Ok(())
    }

    /// Fails with [`MarketError::NotPaused`] if not paused.
    pub fn unpause(&self, caller: &Principal) -> Result<()> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;
        state.access.unpause()?;
        info!(by = %caller, "Core unpaused");
        Ok(())
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().access.is_paused()
    }

    pub fn grant_admin(&self, caller: &Principal, principal: Principal) -> Result<()> {
        Ok(self.state.lock().access.grant(caller, principal)?)
    }

    pub fn revoke_admin(&self, caller: &Principal, principal: &Principal) -> Result<()> {
        Ok(self.state.lock().access.revoke(caller, principal)?)
    }

    #[must_use]
    pub fn is_admin(&self, principal: &Principal) -> bool {
        self.state.lock().access.is_admin(principal)
    }

    pub fn set_oracle_signer(&self, caller: &Principal, signer: Address) -> Result<()> {
        let mut state = self.state.lock();
        state.access.require_admin(caller)?;
        state.settlement.set_oracle_signer(signer);
        Ok(())
    }

    #[must_use]
    pub fn oracle_signer(&self) -> Address {
        self.state.lock().settlement.oracle_signer()
    }

    // --- reads ---

    pub fn get_market(&self, id: MarketId) -> Result<MarketView> {
        let now = self.clock.now();
        let state = self.state.lock();
        Ok(state.market(id)?.view(now, &self.limits))
    }

    /// Sum of bin weights over the tick range `[lower, upper]`.
    pub fn get_range_sum(&self, id: MarketId, lower: i64, upper: i64) -> Result<U256> {
        let state = self.state.lock();
        let market = state.market(id)?;
        let (lo, hi) = market.range_bins(lower, upper)?;
        Ok(market.tree().get_range_sum(lo, hi)?)
    }

    /// Weight of the bin holding `tick`.
    pub fn get_tick_value(&self, id: MarketId, tick: i64) -> Result<U256> {
        let state = self.state.lock();
        let market = state.market(id)?;
        Ok(market.tree().leaf(market.bin_index(tick)?)?)
    }

    pub fn get_position(&self, id: PositionId) -> Result<Position> {
        self.ledger
            .position(id)
            .ok_or_else(|| MarketError::PositionNotFound(id).into())
    }

    pub fn claim_open_timestamp(&self, id: MarketId) -> Result<u64> {
        let state = self.state.lock();
        Ok(state.settlement.claim_open_at(state.market(id)?))
    }

    // --- previews ---

    /// Full quote for opening `[lower, upper]` with `quantity`.
    pub fn quote_open(
        &self,
        id: MarketId,
        lower: i64,
        upper: i64,
        quantity: Quantity,
    ) -> Result<TradeQuote> {
        let state = self.state.lock();
        let market = state.market(id)?;
        let (lo, hi) = market.range_bins(lower, upper)?;
        self.quote_bins(market, lo, hi, quantity, TradeDirection::Buy)
    }

    pub fn calculate_open_cost(
        &self,
        id: MarketId,
        lower: i64,
        upper: i64,
        quantity: Quantity,
    ) -> Result<Amount> {
        Ok(self.quote_open(id, lower, upper, quantity)?.amount)
    }

    pub fn calculate_increase_cost(&self, position_id: PositionId, quantity: Quantity) -> Result<Amount> {
        let state = self.state.lock();
        let position = self.get_position(position_id)?;
        self.quote_position(&state, &position, quantity, TradeDirection::Buy)
            .map(|quote| quote.amount)
    }

    pub fn calculate_decrease_proceeds(
        &self,
        position_id: PositionId,
        quantity: Quantity,
    ) -> Result<Amount> {
        let state = self.state.lock();
        let position = self.get_position(position_id)?;
        require_held(&position, quantity)?;
        self.quote_position(&state, &position, quantity, TradeDirection::Sell)
            .map(|quote| quote.amount)
    }

    pub fn calculate_close_proceeds(&self, position_id: PositionId) -> Result<Amount> {
        let state = self.state.lock();
        let position = self.get_position(position_id)?;
        self.quote_position(&state, &position, position.quantity(), TradeDirection::Sell)
            .map(|quote| quote.amount)
    }

    /// Payout owed once settled: the full quantity if the settlement tick
    /// lies in the position's range, zero otherwise.
    pub fn calculate_claim_amount(&self, position_id: PositionId) -> Result<Amount> {
        let state = self.state.lock();
        let position = self.get_position(position_id)?;
        let market = state.market(position.market_id())?;
        let tick = market
            .settled_tick()
            .ok_or(MarketError::MarketNotSettled(market.id()))?;
        Ok(payout(&position, tick))
    }

    // --- trading ---

    /// Open a new position. Returns its id and the amount charged.
    pub fn open_position(
        &self,
        caller: &Principal,
        id: MarketId,
        lower: i64,
        upper: i64,
        quantity: Quantity,
        max_cost: Amount,
    ) -> Result<(PositionId, Amount)> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let CoreState {
            markets, access, ..
        } = &mut *state;
        access.require_not_paused()?;
        let market = market_mut(markets, id)?;
        require_tradable(market, now)?;
        let (lo, hi) = market.range_bins(lower, upper)?;
        let quote = self.quote_bins(market, lo, hi, quantity, TradeDirection::Buy)?;
        check_cost(&quote, max_cost)?;

        let owner = *caller;
        let position_id = market.tree_mut().atomically(|tree| {
            quote.apply(tree, lo, hi)?;
            self.custody.pull(&self.principal, owner, quote.amount)?;
            self.ledger
                .mint(&self.principal, owner, id, lower, upper, quantity)
                .map_err(|e| self.refund(owner, quote.amount, e))
        })?;

        info!(
            market_id = %id,
            position_id = %position_id,
            owner = %owner,
            lower,
            upper,
            quantity,
            cost = quote.amount,
            chunks = quote.steps.len(),
            "Position opened"
        );
        Ok((position_id, quote.amount))
    }

    /// Add `quantity` to an existing position. Returns the amount charged.
    pub fn increase_position(
        &self,
        caller: &Principal,
        position_id: PositionId,
        quantity: Quantity,
        max_cost: Amount,
    ) -> Result<Amount> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let position = self.owned_position(caller, position_id)?;
        let CoreState {
            markets, access, ..
        } = &mut *state;
        access.require_not_paused()?;
        let market = market_mut(markets, position.market_id())?;
        require_tradable(market, now)?;
        let (lo, hi) = market.range_bins(position.lower_tick(), position.upper_tick())?;
        let quote = self.quote_bins(market, lo, hi, quantity, TradeDirection::Buy)?;
        check_cost(&quote, max_cost)?;
        let new_quantity = position
            .quantity()
            .checked_add(quantity)
            .ok_or(MathError::Overflow {
                op: "increase_position",
            })?;

        let owner = position.owner();
        market.tree_mut().atomically(|tree| {
            quote.apply(tree, lo, hi)?;
            self.custody.pull(&self.principal, owner, quote.amount)?;
            self.ledger
                .set_quantity(&self.principal, position_id, new_quantity)
                .map_err(|e| self.refund(owner, quote.amount, e))
        })?;

        info!(
            position_id = %position_id,
            quantity,
            new_quantity,
            cost = quote.amount,
            "Position increased"
        );
        Ok(quote.amount)
    }

    /// Sell `quantity` out of a position; a position reaching zero is
    /// burned. Returns the proceeds paid.
    pub fn decrease_position(
        &self,
        caller: &Principal,
        position_id: PositionId,
        quantity: Quantity,
        min_proceeds: Amount,
    ) -> Result<Amount> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let position = self.owned_position(caller, position_id)?;
        require_held(&position, quantity)?;
        self.sell(&mut state, now, &position, quantity, min_proceeds, "Position decreased")
    }

    /// Sell the whole position and burn it. Returns the proceeds paid.
    pub fn close_position(
        &self,
        caller: &Principal,
        position_id: PositionId,
        min_proceeds: Amount,
    ) -> Result<Amount> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let position = self.owned_position(caller, position_id)?;
        self.sell(&mut state, now, &position, position.quantity(), min_proceeds, "Position closed")
    }

    /// Pay out a position of a settled market and burn it.
    pub fn claim_payout(&self, caller: &Principal, position_id: PositionId) -> Result<Amount> {
        let now = self.clock.now();
        let state = self.state.lock();
        let position = self.owned_position(caller, position_id)?;
        let market = state.market(position.market_id())?;
        let tick = state.settlement.require_claimable(market, now)?;
        let amount = payout(&position, tick);

        let owner = position.owner();
        if amount > 0 {
            self.custody.push(&self.principal, owner, amount)?;
        }
        if let Err(e) = self.ledger.burn(&self.principal, position_id) {
            return Err(if amount > 0 {
                self.claw_back(owner, amount, e)
            } else {
                e
            });
        }

        info!(
            market_id = %market.id(),
            position_id = %position_id,
            owner = %owner,
            settlement_tick = tick,
            payout = amount,
            "Payout claimed"
        );
        Ok(amount)
    }

    // --- settlement ---

    /// Submit an oracle-signed sample. Open to any caller.
    pub fn submit_settlement(
        &self,
        id: MarketId,
        value: i64,
        price_timestamp: u64,
        signature: &[u8],
    ) -> Result<Submission> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let CoreState {
            markets,
            access,
            settlement,
            ..
        } = &mut *state;
        access.require_not_paused()?;
        let market = market_mut(markets, id)?;
        settlement.submit(market, value, price_timestamp, signature, now)
    }

    /// Commit the retained candidate. Returns the settlement tick.
    pub fn finalize_settlement(
        &self,
        caller: &Principal,
        id: MarketId,
        force_default: bool,
    ) -> Result<i64> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let CoreState {
            markets,
            access,
            settlement,
            ..
        } = &mut *state;
        access.require_admin(caller)?;
        let market = market_mut(markets, id)?;
        settlement.finalize(market, force_default, now)
    }

    /// Settle directly at `value`, bypassing oracle candidates.
    pub fn settle_market(&self, caller: &Principal, id: MarketId, value: i64) -> Result<i64> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let CoreState {
            markets,
            access,
            settlement,
            ..
        } = &mut *state;
        access.require_admin(caller)?;
        let market = market_mut(markets, id)?;
        settlement.settle(market, value, now)
    }

    // --- helpers ---

    fn quote_bins(
        &self,
        market: &Market,
        lo: usize,
        hi: usize,
        quantity: Quantity,
        direction: TradeDirection,
    ) -> Result<TradeQuote> {
        let tree = market.tree();
        let total = tree.get_total_sum()?;
        let range = tree.get_range_sum(lo, hi)?;
        self.pricing
            .quote(market.alpha(), total, range, quantity, direction)
    }

    fn quote_position(
        &self,
        state: &CoreState,
        position: &Position,
        quantity: Quantity,
        direction: TradeDirection,
    ) -> Result<TradeQuote> {
        let market = state.market(position.market_id())?;
        let (lo, hi) = market.range_bins(position.lower_tick(), position.upper_tick())?;
        self.quote_bins(market, lo, hi, quantity, direction)
    }

    /// Callers hold the state lock so the record cannot change before the
    /// trade that reads it commits.
    fn owned_position(&self, caller: &Principal, id: PositionId) -> Result<Position> {
        let position = self.get_position(id)?;
        if position.owner() != *caller {
            return Err(MarketError::NotPositionOwner(id).into());
        }
        Ok(position)
    }

    fn sell(
        &self,
        state: &mut CoreState,
        now: u64,
        position: &Position,
        quantity: Quantity,
        min_proceeds: Amount,
        event: &'static str,
    ) -> Result<Amount> {
        let CoreState {
            markets, access, ..
        } = state;
        access.require_not_paused()?;
        let market = market_mut(markets, position.market_id())?;
        require_tradable(market, now)?;
        let (lo, hi) = market.range_bins(position.lower_tick(), position.upper_tick())?;
        let quote = self.quote_bins(market, lo, hi, quantity, TradeDirection::Sell)?;
        if quote.amount < min_proceeds {
            return Err(MarketError::ProceedsBelowMinimum {
                proceeds: quote.amount,
                min: min_proceeds,
            }
            .into());
        }

        let owner = position.owner();
        let position_id = position.id();
        let remaining = position.quantity() - quantity;
        market.tree_mut().atomically(|tree| {
            quote.apply(tree, lo, hi)?;
            self.custody.push(&self.principal, owner, quote.amount)?;
            let ledger_result = if remaining == 0 {
                self.ledger.burn(&self.principal, position_id)
            } else {
                self.ledger
                    .set_quantity(&self.principal, position_id, remaining)
            };
            ledger_result.map_err(|e| self.claw_back(owner, quote.amount, e))
        })?;

        info!(
            position_id = %position_id,
            quantity,
            remaining,
            proceeds = quote.amount,
            chunks = quote.steps.len(),
            "{}",
            event
        );
        Ok(quote.amount)
    }

    /// Return funds pulled for a trade whose ledger step failed with `cause`.
    fn refund(&self, owner: Principal, amount: Amount, cause: Error) -> Error {
        match self.custody.push(&self.principal, owner, amount) {
            Ok(()) => cause,
            Err(e) => {
                error!(owner = %owner, amount, error = %e, "Refund after failed ledger update failed");
                Error::compensation_failed(cause, e)
            }
        }
    }

    /// Recover funds pushed for a trade whose ledger step failed with `cause`.
    fn claw_back(&self, owner: Principal, amount: Amount, cause: Error) -> Error {
        match self.custody.pull(&self.principal, owner, amount) {
            Ok(()) => cause,
            Err(e) => {
                error!(owner = %owner, amount, error = %e, "Clawback after failed ledger update failed");
                Error::compensation_failed(cause, e)
            }
        }
    }
}

fn require_held(position: &Position, quantity: Quantity) -> Result<()> {
    if quantity > position.quantity() {
        return Err(MarketError::InsufficientPositionQuantity {
            position: position.id(),
            available: position.quantity(),
            requested: quantity,
        }
        .into());
    }
    Ok(())
}

fn check_cost(quote: &TradeQuote, max_cost: Amount) -> Result<()> {
    if quote.amount > max_cost {
        return Err(MarketError::CostExceedsMaximum {
            cost: quote.amount,
            max: max_cost,
        }
        .into());
    }
    Ok(())
}

fn payout(position: &Position, settlement_tick: i64) -> Amount {
    if position.covers(settlement_tick) {
        position.quantity()
    } else {
        0
    }
}

/// Assembles a [`MarketCore`] from its collaborators.
#[derive(Default)]
pub struct MarketCoreBuilder {
    principal: Option<Principal>,
    limits: ProtocolLimits,
    oracle_signer: Option<Address>,
    admins: Vec<Principal>,
    clock: Option<Arc<dyn Clock>>,
    ledger: Option<Arc<dyn PositionLedger>>,
    custody: Option<Arc<dyn PaymentCustody>>,
}

impl MarketCoreBuilder {
    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: ProtocolLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn oracle_signer(mut self, signer: Address) -> Self {
        self.oracle_signer = Some(signer);
        self
    }

    #[must_use]
    pub fn admins(mut self, admins: impl IntoIterator<Item = Principal>) -> Self {
        self.admins.extend(admins);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn PositionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    #[must_use]
    pub fn custody(mut self, custody: Arc<dyn PaymentCustody>) -> Self {
        self.custody = Some(custody);
        self
    }

    /// Fails if the principal, oracle signer or a collaborator is missing.
    /// The clock defaults to the system clock.
    pub fn build(self) -> Result<MarketCore> {
        let principal = self
            .principal
            .ok_or(ConfigError::MissingField { field: "access.core" })?;
        let oracle_signer = self
            .oracle_signer
            .ok_or(ConfigError::MissingField { field: "oracle.signer" })?;
        let ledger = self
            .ledger
            .ok_or(ConfigError::MissingField { field: "ledger" })?;
        let custody = self
            .custody
            .ok_or(ConfigError::MissingField { field: "custody" })?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let pricing = PricingEngine::new(&self.limits)?;

        info!(
            core = %principal,
            oracle = %oracle_signer,
            admins = self.admins.len(),
            "Market core ready"
        );
        Ok(MarketCore {
            principal,
            limits: self.limits,
            pricing,
            clock,
            ledger,
            custody,
            state: Mutex::new(CoreState {
                markets: BTreeMap::new(),
                next_market_id: 1,
                access: AccessControl::new(self.admins),
                settlement: SettlementMachine::new(oracle_signer, &self.limits),
            }),
        })
    }
}
