//! Ledger and custody wrappers that slow down or fail the in-memory adapters.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use alloy_primitives::Address;
use clmsr::adapter::outbound::{InMemoryCustody, InMemoryLedger, ManualClock};
use clmsr::application::MarketCore;
use clmsr::domain::{Amount, MarketId, Position, PositionId, Principal, Quantity};
use clmsr::error::{AccessError, CollaboratorError, Result};
use clmsr::port::{PaymentCustody, PositionLedger};
use clmsr::testkit::domain::START;
use clmsr::testkit::harness::{ADMIN, CORE};

/// Core over arbitrary collaborators, clock at [`START`].
pub fn core_with(ledger: Arc<dyn PositionLedger>, custody: Arc<dyn PaymentCustody>) -> MarketCore {
    MarketCore::builder()
        .principal(CORE)
        .oracle_signer(Address::ZERO)
        .admins([ADMIN])
        .clock(Arc::new(ManualClock::new(START)))
        .ledger(ledger)
        .custody(custody)
        .build()
        .unwrap()
}

/// Ledger whose lookups linger, recording how many were in flight at once.
pub struct SlowLookupLedger {
    pub inner: InMemoryLedger,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowLookupLedger {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryLedger::new(CORE),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most lookups ever observed running concurrently.
    pub fn peak_overlap(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl PositionLedger for SlowLookupLedger {
    fn mint(
        &self,
        caller: &Principal,
        owner: Principal,
        market_id: MarketId,
        lower_tick: i64,
        upper_tick: i64,
        quantity: Quantity,
    ) -> Result<PositionId> {
        self.inner
            .mint(caller, owner, market_id, lower_tick, upper_tick, quantity)
    }

    fn set_quantity(&self, caller: &Principal, id: PositionId, quantity: Quantity) -> Result<()> {
        self.inner.set_quantity(caller, id, quantity)
    }

    fn burn(&self, caller: &Principal, id: PositionId) -> Result<()> {
        self.inner.burn(caller, id)
    }

    fn position(&self, id: PositionId) -> Option<Position> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        thread::sleep(self.delay);
        let found = self.inner.position(id);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        found
    }
}

/// Ledger that refuses mints or updates on demand.
pub struct FlakyLedger {
    pub inner: InMemoryLedger,
    pub reject_mint: AtomicBool,
    pub reject_updates: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLedger::new(CORE),
            reject_mint: AtomicBool::new(false),
            reject_updates: AtomicBool::new(false),
        }
    }

    fn refuse(caller: &Principal) -> clmsr::error::Error {
        AccessError::Unauthorized { principal: *caller }.into()
    }
}

impl PositionLedger for FlakyLedger {
    fn mint(
        &self,
        caller: &Principal,
        owner: Principal,
        market_id: MarketId,
        lower_tick: i64,
        upper_tick: i64,
        quantity: Quantity,
    ) -> Result<PositionId> {
        if self.reject_mint.load(Ordering::SeqCst) {
            return Err(Self::refuse(caller));
        }
        self.inner
            .mint(caller, owner, market_id, lower_tick, upper_tick, quantity)
    }

    fn set_quantity(&self, caller: &Principal, id: PositionId, quantity: Quantity) -> Result<()> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(Self::refuse(caller));
        }
        self.inner.set_quantity(caller, id, quantity)
    }

    fn burn(&self, caller: &Principal, id: PositionId) -> Result<()> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(Self::refuse(caller));
        }
        self.inner.burn(caller, id)
    }

    fn position(&self, id: PositionId) -> Option<Position> {
        self.inner.position(id)
    }
}

/// Custody whose pulls or pushes can be switched off.
pub struct FlakyCustody {
    pub inner: InMemoryCustody,
    pub reject_pull: AtomicBool,
    pub reject_push: AtomicBool,
}

impl FlakyCustody {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCustody::new(CORE),
            reject_pull: AtomicBool::new(false),
            reject_push: AtomicBool::new(false),
        }
    }
}

impl PaymentCustody for FlakyCustody {
    fn pull(&self, caller: &Principal, from: Principal, amount: Amount) -> Result<()> {
        if self.reject_pull.load(Ordering::SeqCst) {
            return Err(CollaboratorError::InsufficientBalance {
                principal: from,
                balance: 0,
                needed: amount,
            }
            .into());
        }
        self.inner.pull(caller, from, amount)
    }

    fn push(&self, caller: &Principal, to: Principal, amount: Amount) -> Result<()> {
        if self.reject_push.load(Ordering::SeqCst) {
            return Err(CollaboratorError::InsufficientBalance {
                principal: *caller,
                balance: 0,
                needed: amount,
            }
            .into());
        }
        self.inner.push(caller, to, amount)
    }
}
