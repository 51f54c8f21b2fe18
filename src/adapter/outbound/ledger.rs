//! In-memory position ledger.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::{MarketId, Position, PositionId, Principal, Quantity};
use crate::error::{AccessError, CollaboratorError, Result};
use crate::port::PositionLedger;

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    positions: HashMap<PositionId, Position>,
}

/// Position ledger that only accepts mutations from the configured core.
#[derive(Debug)]
pub struct InMemoryLedger {
    core: Principal,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new(core: Principal) -> Self {
        Self {
            core,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Positions held by `owner`, ordered by id.
    #[must_use]
    pub fn positions_of(&self, owner: Principal) -> Vec<Position> {
        let state = self.state.lock();
        let mut held: Vec<Position> = state
            .positions
            .values()
            .filter(|p| p.owner() == owner)
            .copied()
            .collect();
        held.sort_by_key(Position::id);
        held
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn authorize(&self, caller: &Principal) -> Result<()> {
        if *caller == self.core {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { principal: *caller }.into())
        }
    }
}

impl PositionLedger for InMemoryLedger {
    fn mint(
        &self,
        caller: &Principal,
        owner: Principal,
        market_id: MarketId,
        lower_tick: i64,
        upper_tick: i64,
        quantity: Quantity,
    ) -> Result<PositionId> {
        self.authorize(caller)?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = PositionId::new(state.next_id);
        let position = Position::new(id, owner, market_id, lower_tick, upper_tick, quantity);
        state.positions.insert(id, position);
        Ok(id)
    }

    fn set_quantity(&self, caller: &Principal, id: PositionId, quantity: Quantity) -> Result<()> {
        self.authorize(caller)?;
        let mut state = self.state.lock();
        let position = state
            .positions
            .get_mut(&id)
            .ok_or(CollaboratorError::UnknownPosition(id))?;
        *position = position.with_quantity(quantity);
        Ok(())
    }

    fn burn(&self, caller: &Principal, id: PositionId) -> Result<()> {
        self.authorize(caller)?;
        self.state
            .lock()
            .positions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CollaboratorError::UnknownPosition(id).into())
    }

    fn position(&self, id: PositionId) -> Option<Position> {
        self.state.lock().positions.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloy_primitives::Address;

    fn core() -> Principal {
        Principal::new(Address::with_last_byte(0xc0))
    }

    fn alice() -> Principal {
        Principal::new(Address::with_last_byte(0xa1))
    }

    #[test]
    fn mint_assigns_sequential_ids() {
        let ledger = InMemoryLedger::new(core());
        let first = ledger.mint(&core(), alice(), MarketId::new(1), 0, 10, 5).unwrap();
        let second = ledger.mint(&core(), alice(), MarketId::new(1), 0, 10, 5).unwrap();
        assert_eq!(first, PositionId::new(1));
        assert_eq!(second, PositionId::new(2));
        assert_eq!(ledger.positions_of(alice()).len(), 2);
    }

    #[test]
    fn rejects_callers_other_than_core() {
        let ledger = InMemoryLedger::new(core());
        let err = ledger
            .mint(&alice(), alice(), MarketId::new(1), 0, 10, 5)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Access(AccessError::Unauthorized { principal }) if principal == alice()
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn set_quantity_and_burn() {
        let ledger = InMemoryLedger::new(core());
        let id = ledger.mint(&core(), alice(), MarketId::new(1), 0, 10, 5).unwrap();
        ledger.set_quantity(&core(), id, 9).unwrap();
        assert_eq!(ledger.position(id).unwrap().quantity(), 9);
        ledger.burn(&core(), id).unwrap();
        assert!(ledger.position(id).is_none());
        assert!(matches!(
            ledger.burn(&core(), id),
            Err(Error::Collaborator(CollaboratorError::UnknownPosition(_)))
        ));
    }
}
