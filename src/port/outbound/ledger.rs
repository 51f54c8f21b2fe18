//! Position ledger port.
//!
//! The ledger owns position records; the core only asks it to mint, resize
//! and burn. Implementations must reject every mutating call whose caller
//! is not the core.

use crate::domain::{MarketId, Position, PositionId, Principal, Quantity};
use crate::error::Result;

pub trait PositionLedger: Send + Sync {
    /// Record a new position for `owner` and return its id.
    fn mint(
        &self,
        caller: &Principal,
        owner: Principal,
        market_id: MarketId,
        lower_tick: i64,
        upper_tick: i64,
        quantity: Quantity,
    ) -> Result<PositionId>;

    /// Overwrite the quantity of an existing position.
    fn set_quantity(&self, caller: &Principal, id: PositionId, quantity: Quantity) -> Result<()>;

    /// Remove a position.
    fn burn(&self, caller: &Principal, id: PositionId) -> Result<()>;

    /// Look up a position; open to any caller.
    fn position(&self, id: PositionId) -> Option<Position>;
}
