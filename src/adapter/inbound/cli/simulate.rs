//! Handler for `simulate`: replay a scenario file against an in-memory core.
//!
//! ```toml
//! settle = 120
//!
//! [market]
//! min_tick = 0
//! max_tick = 200
//! tick_spacing = 10
//! alpha = "10"
//!
//! [[seed]]
//! lower = 100
//! upper = 150
//! factor = "2"
//!
//! [[trade]]
//! action = "open"
//! lower = 100
//! upper = 130
//! quantity = "5"
//!
//! [[trade]]
//! action = "close"
//! position = 1
//! ```

use std::path::Path;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::command::SimulateArgs;
use super::{load_config, output};
use crate::adapter::outbound::ManualClock;
use crate::domain::{money, wad, Amount, MarketError, MarketId, MarketParams, PositionId, Principal};
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::{build_in_memory, InMemoryDeployment};

/// Scenario markets trade during `[0, MARKET_END)`.
const MARKET_END: u64 = 3_600;

/// Funding credited to the scenario trader up front.
const TRADER_FUNDING: Amount = 1_000_000_000 * 1_000_000;

/// Vault subsidy so winning claims can exceed collected premiums.
const VAULT_SUBSIDY: Amount = 1_000_000 * 1_000_000;

const TRADER: Principal = Principal::new(Address::repeat_byte(0x7a));

#[derive(Debug, Deserialize)]
struct Scenario {
    market: ScenarioMarket,
    #[serde(default)]
    seed: Vec<SeedStep>,
    #[serde(default, rename = "trade")]
    trades: Vec<TradeStep>,
    settle: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ScenarioMarket {
    min_tick: i64,
    max_tick: i64,
    tick_spacing: i64,
    alpha: Decimal,
}

#[derive(Debug, Deserialize)]
struct SeedStep {
    lower: i64,
    upper: i64,
    factor: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TradeStep {
    Open {
        lower: i64,
        upper: i64,
        quantity: Decimal,
    },
    Increase {
        position: u64,
        quantity: Decimal,
    },
    Decrease {
        position: u64,
        quantity: Decimal,
    },
    Close {
        position: u64,
    },
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    action: &'static str,
    position: PositionId,
    lower: i64,
    upper: i64,
    /// Paid for buys, received for sells.
    amount: Decimal,
    range_sum: Decimal,
    total_sum: Decimal,
}

#[derive(Debug, Serialize)]
struct ClaimReport {
    position: PositionId,
    payout: Decimal,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    market_id: MarketId,
    bins: usize,
    steps: Vec<StepReport>,
    settlement_tick: Option<i64>,
    claims: Vec<ClaimReport>,
    trader_balance: Decimal,
    vault_balance: Decimal,
}

/// Execute `simulate`.
pub fn execute(args: &SimulateArgs) -> Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    config.init_logging();
    let scenario = read_scenario(&args.scenario)?;

    let clock = Arc::new(ManualClock::new(0));
    let deployment = build_in_memory(&config, clock.clone())?;
    let report = replay(&deployment, &clock, &scenario)?;

    if output::is_json() {
        return output::json(&report);
    }
    print_report(&report);
    Ok(())
}

fn read_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content).map_err(ConfigError::Parse)?)
}

fn quantity(value: Decimal) -> Result<u128> {
    Ok(money::from_display(value).ok_or(MarketError::InvalidQuantity)?)
}

fn replay(
    deployment: &InMemoryDeployment,
    clock: &ManualClock,
    scenario: &Scenario,
) -> Result<SimulationReport> {
    let core = &deployment.core;
    let operator = deployment.operator;
    let params = MarketParams {
        id: None,
        min_tick: scenario.market.min_tick,
        max_tick: scenario.market.max_tick,
        tick_spacing: scenario.market.tick_spacing,
        start_timestamp: 0,
        end_timestamp: MARKET_END,
        settlement_timestamp: None,
        alpha: wad::from_decimal(scenario.market.alpha)?,
    };
    let market_id = core.create_market(&operator, &params)?;

    if !scenario.seed.is_empty() {
        let lowers: Vec<i64> = scenario.seed.iter().map(|s| s.lower).collect();
        let uppers: Vec<i64> = scenario.seed.iter().map(|s| s.upper).collect();
        let factors = scenario
            .seed
            .iter()
            .map(|s| wad::from_decimal(s.factor))
            .collect::<std::result::Result<Vec<U256>, _>>()?;
        core.apply_range_factor_batch(&operator, market_id, &lowers, &uppers, &factors, "scenario seed")?;
    }

    deployment.custody.deposit(TRADER, TRADER_FUNDING);
    deployment.custody.fund_vault(VAULT_SUBSIDY);

    let mut steps = Vec::with_capacity(scenario.trades.len());
    for (index, trade) in scenario.trades.iter().enumerate() {
        let (action, position_id, lower, upper, amount) = match *trade {
            TradeStep::Open {
                lower,
                upper,
                quantity: q,
            } => {
                let (id, cost) =
                    core.open_position(&TRADER, market_id, lower, upper, quantity(q)?, Amount::MAX)?;
                ("open", id, lower, upper, cost)
            }
            TradeStep::Increase { position, quantity: q } => {
                let id = PositionId::new(position);
                let held = core.get_position(id)?;
                let cost = core.increase_position(&TRADER, id, quantity(q)?, Amount::MAX)?;
                ("increase", id, held.lower_tick(), held.upper_tick(), cost)
            }
            TradeStep::Decrease { position, quantity: q } => {
                let id = PositionId::new(position);
                let held = core.get_position(id)?;
                let proceeds = core.decrease_position(&TRADER, id, quantity(q)?, 0)?;
                ("decrease", id, held.lower_tick(), held.upper_tick(), proceeds)
            }
            TradeStep::Close { position } => {
                let id = PositionId::new(position);
                let held = core.get_position(id)?;
                let proceeds = core.close_position(&TRADER, id, 0)?;
                ("close", id, held.lower_tick(), held.upper_tick(), proceeds)
            }
        };
        let range_sum = core.get_range_sum(market_id, lower, upper)?;
        let total_sum = core.get_market(market_id)?.total_sum;
        steps.push(StepReport {
            step: index + 1,
            action,
            position: position_id,
            lower,
            upper,
            amount: money::to_display(amount),
            range_sum: wad::to_decimal(range_sum)?,
            total_sum: wad::to_decimal(total_sum)?,
        });
    }

    let mut settlement_tick = None;
    let mut claims = Vec::new();
    if let Some(value) = scenario.settle {
        clock.set(MARKET_END);
        settlement_tick = Some(core.settle_market(&operator, market_id, value)?);
        clock.set(core.claim_open_timestamp(market_id)?);
        for position in deployment.ledger.positions_of(TRADER) {
            let payout = core.claim_payout(&TRADER, position.id())?;
            claims.push(ClaimReport {
                position: position.id(),
                payout: money::to_display(payout),
            });
        }
    }

    Ok(SimulationReport {
        market_id,
        bins: core.get_market(market_id)?.num_bins,
        steps,
        settlement_tick,
        claims,
        trader_balance: money::to_display(deployment.custody.balance_of(TRADER)),
        vault_balance: money::to_display(deployment.custody.vault()),
    })
}

fn print_report(report: &SimulationReport) {
    output::section(&format!("Simulation: {}", report.market_id));
    output::field("Bins", report.bins);
    for step in &report.steps {
        output::field(
            &format!("#{} {}", step.step, step.action),
            format!(
                "{} [{}, {}] amount={} range_sum={} total_sum={}",
                step.position, step.lower, step.upper, step.amount, step.range_sum, step.total_sum
            ),
        );
    }
    if let Some(tick) = report.settlement_tick {
        output::section("Settlement");
        output::field("Tick", tick);
        for claim in &report.claims {
            output::field(&claim.position.to_string(), claim.payout);
        }
    }
    output::section("Balances");
    output::field("Trader", report.trader_balance);
    output::field("Vault", report.vault_balance);
}
