//! A fully wired core for exercising trades and settlement.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};

use crate::adapter::outbound::{InMemoryCustody, InMemoryLedger, ManualClock, OracleSigner};
use crate::application::MarketCore;
use crate::domain::{Amount, MarketId, MarketParams, Principal, ProtocolLimits};

use super::domain::START;

pub const ADMIN: Principal = Principal::new(Address::repeat_byte(0xad));
pub const CORE: Principal = Principal::new(Address::repeat_byte(0xc0));

/// Funding given to each trader by [`TestHarness::trader`].
pub const TRADER_FUNDING: Amount = 1_000_000 * 1_000_000;

/// Vault subsidy seeded at construction.
pub const VAULT_SUBSIDY: Amount = 1_000_000 * 1_000_000;

pub struct TestHarness {
    pub core: MarketCore,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
    pub custody: Arc<InMemoryCustody>,
    pub oracle: OracleSigner,
}

impl TestHarness {
    /// Default limits, clock at [`START`].
    pub fn new() -> Self {
        Self::with_limits(ProtocolLimits::default())
    }

    pub fn with_limits(limits: ProtocolLimits) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let ledger = Arc::new(InMemoryLedger::new(CORE));
        let custody = Arc::new(InMemoryCustody::new(CORE));
        custody.fund_vault(VAULT_SUBSIDY);
        let oracle = OracleSigner::random();
        let core = MarketCore::builder()
            .principal(CORE)
            .limits(limits)
            .oracle_signer(oracle.address())
            .admins([ADMIN])
            .clock(clock.clone())
            .ledger(ledger.clone())
            .custody(custody.clone())
            .build()
            .expect("harness core builds");
        Self {
            core,
            clock,
            ledger,
            custody,
            oracle,
        }
    }

    /// A distinct principal per `n`, funded with [`TRADER_FUNDING`].
    pub fn trader(&self, n: u8) -> Principal {
        let trader = self.unfunded(n);
        self.custody.deposit(trader, TRADER_FUNDING);
        trader
    }

    pub fn unfunded(&self, n: u8) -> Principal {
        let mut bytes = [0x10; 20];
        bytes[19] = n;
        Principal::new(Address::from(bytes))
    }

    pub fn create_market(&self, params: &MarketParams) -> MarketId {
        self.core
            .create_market(&ADMIN, params)
            .expect("market is created")
    }

    /// Oracle signature over `(market, value, price_timestamp)`.
    pub fn sign(&self, market: MarketId, value: i64, price_timestamp: u64) -> Bytes {
        self.oracle
            .sign_settlement(market, value, price_timestamp)
            .expect("oracle signs")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
