//! In-memory payment custody.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::{Amount, Principal};
use crate::error::{AccessError, CollaboratorError, Result};
use crate::port::PaymentCustody;

#[derive(Debug, Default)]
struct CustodyState {
    balances: HashMap<Principal, Amount>,
    vault: Amount,
}

/// Token balances plus the vault the core trades against.
#[derive(Debug)]
pub struct InMemoryCustody {
    core: Principal,
    state: Mutex<CustodyState>,
}

impl InMemoryCustody {
    #[must_use]
    pub fn new(core: Principal) -> Self {
        Self {
            core,
            state: Mutex::new(CustodyState::default()),
        }
    }

    /// Credit `owner` with freshly issued tokens.
    pub fn deposit(&self, owner: Principal, amount: Amount) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(owner).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Add market-maker subsidy to the vault. Payouts on a winning bin can
    /// exceed the premiums collected by up to `alpha * ln(bins)`.
    pub fn fund_vault(&self, amount: Amount) {
        let mut state = self.state.lock();
        state.vault = state.vault.saturating_add(amount);
    }

    #[must_use]
    pub fn balance_of(&self, owner: Principal) -> Amount {
        self.state.lock().balances.get(&owner).copied().unwrap_or(0)
    }

    /// Tokens currently held on behalf of the core.
    #[must_use]
    pub fn vault(&self) -> Amount {
        self.state.lock().vault
    }

    fn authorize(&self, caller: &Principal) -> Result<()> {
        if *caller == self.core {
            Ok(())
        } else {
            Err(AccessError::Unauthorized { principal: *caller }.into())
        }
    }
}

impl PaymentCustody for InMemoryCustody {
    fn pull(&self, caller: &Principal, from: Principal, amount: Amount) -> Result<()> {
        self.authorize(caller)?;
        let mut state = self.state.lock();
        let balance = state.balances.get(&from).copied().unwrap_or(0);
        if balance < amount {
            return Err(CollaboratorError::InsufficientBalance {
                principal: from,
                balance,
                needed: amount,
            }
            .into());
        }
        state.balances.insert(from, balance - amount);
        state.vault = state.vault.saturating_add(amount);
        Ok(())
    }

    fn push(&self, caller: &Principal, to: Principal, amount: Amount) -> Result<()> {
        self.authorize(caller)?;
        let mut state = self.state.lock();
        if state.vault < amount {
            return Err(CollaboratorError::InsufficientBalance {
                principal: self.core,
                balance: state.vault,
                needed: amount,
            }
            .into());
        }
        state.vault -= amount;
        let balance = state.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
        Ok(())
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

    fn bob() -> Principal {
        Principal::new(Address::with_last_byte(0xb0))
    }

    #[test]
    fn pull_then_push_moves_through_vault() {
        let custody = InMemoryCustody::new(core());
        custody.deposit(bob(), 100);
        custody.pull(&core(), bob(), 60).unwrap();
        assert_eq!(custody.balance_of(bob()), 40);
        assert_eq!(custody.vault(), 60);

        custody.push(&core(), bob(), 10).unwrap();
        assert_eq!(custody.balance_of(bob()), 50);
        assert_eq!(custody.vault(), 50);
    }

    #[test]
    fn pull_beyond_balance_fails_without_side_effects() {
        let custody = InMemoryCustody::new(core());
        custody.deposit(bob(), 5);
        let err = custody.pull(&core(), bob(), 6).unwrap_err();
        assert!(matches!(
            err,
            Error::Collaborator(CollaboratorError::InsufficientBalance { balance: 5, needed: 6, .. })
        ));
        assert_eq!(custody.balance_of(bob()), 5);
        assert_eq!(custody.vault(), 0);
    }

    #[test]
    fn only_core_may_move_funds() {
        let custody = InMemoryCustody::new(core());
        custody.deposit(bob(), 5);
        assert!(matches!(
            custody.pull(&bob(), bob(), 1),
            Err(Error::Access(AccessError::Unauthorized { .. }))
        ));
    }
}
