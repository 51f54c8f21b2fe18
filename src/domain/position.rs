//! Range positions held in the external position ledger.

use serde::{Deserialize, Serialize};

use super::ids::{MarketId, PositionId, Principal};
use super::money::Quantity;

/// Exposure to the inclusive tick range `[lower_tick, upper_tick]` of one
/// market. Pays `quantity` if the settlement tick falls inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    owner: Principal,
    market_id: MarketId,
    lower_tick: i64,
    upper_tick: i64,
    quantity: Quantity,
}

impl Position {
    #[must_use]
    pub const fn new(
        id: PositionId,
        owner: Principal,
        market_id: MarketId,
        lower_tick: i64,
        upper_tick: i64,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            owner,
            market_id,
            lower_tick,
            upper_tick,
            quantity,
        }
    }

    #[must_use]
    pub const fn id(&self) -> PositionId {
        self.id
    }

    #[must_use]
    pub const fn owner(&self) -> Principal {
        self.owner
    }

    #[must_use]
    pub const fn market_id(&self) -> MarketId {
        self.market_id
    }

    #[must_use]
    pub const fn lower_tick(&self) -> i64 {
        self.lower_tick
    }

    #[must_use]
    pub const fn upper_tick(&self) -> i64 {
        self.upper_tick
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Returns a copy holding `quantity` instead.
    #[must_use]
    pub const fn with_quantity(self, quantity: Quantity) -> Self {
        Self { quantity, ..self }
    }

    /// Returns true if `tick` lies inside the position's range.
    #[must_use]
    pub const fn covers(&self, tick: i64) -> bool {
        self.lower_tick <= tick && tick <= self.upper_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn position() -> Position {
        Position::new(
            PositionId::new(1),
            Principal::new(Address::with_last_byte(1)),
            MarketId::new(1),
            100,
            120,
            5_000_000,
        )
    }

    #[test]
    fn covers_is_inclusive() {
        let pos = position();
        assert!(pos.covers(100));
        assert!(pos.covers(120));
        assert!(!pos.covers(99));
        assert!(!pos.covers(121));
    }

    #[test]
    fn with_quantity_keeps_identity() {
        let pos = position().with_quantity(1);
        assert_eq!(pos.id(), PositionId::new(1));
        assert_eq!(pos.quantity(), 1);
    }
}
