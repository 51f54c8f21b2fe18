//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Market identifier - newtype for type safety.
///
/// The inner u64 is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(u64);

impl MarketId {
    /// Create a new `MarketId` from a u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "market-{}", self.0)
    }
}

impl From<u64> for MarketId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Position identifier assigned by the position ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(u64);

impl PositionId {
    /// Create a new `PositionId` from a u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos-{}", self.0)
    }
}

impl From<u64> for PositionId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Identity presented with every mutating call.
///
/// Administrative calls check it against the core's allow-list;
/// collaborators check it against the core's own principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(Address);

impl Principal {
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Address> for Principal {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}

impl FromStr for Principal {
    type Err = <Address as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_id_new_and_value() {
        let id = MarketId::new(7);
        assert_eq!(id.value(), 7);
        assert_eq!(MarketId::from(7), id);
    }

    #[test]
    fn market_id_display() {
        assert_eq!(format!("{}", MarketId::new(3)), "market-3");
    }

    #[test]
    fn position_id_display() {
        assert_eq!(format!("{}", PositionId::new(42)), "pos-42");
    }

    #[test]
    fn principal_parses_hex_address() {
        let principal: Principal = "0x00000000000000000000000000000000000000aa"
            .parse()
            .unwrap();
        assert_eq!(principal.address(), Address::with_last_byte(0xaa));
    }

    #[test]
    fn principal_rejects_garbage() {
        assert!("not-an-address".parse::<Principal>().is_err());
    }
}
