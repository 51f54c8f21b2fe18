//! Payment custody port.
//!
//! Amounts crossing this boundary are 6-decimal integers, already rounded
//! in the protocol's favour: pulls round up, pushes round down.

use crate::domain::{Amount, Principal};
use crate::error::Result;

pub trait PaymentCustody: Send + Sync {
    /// Move `amount` from `from` into the core's vault.
    fn pull(&self, caller: &Principal, from: Principal, amount: Amount) -> Result<()>;

    /// Move `amount` from the core's vault to `to`.
    fn push(&self, caller: &Principal, to: Principal, amount: Amount) -> Result<()>;
}
