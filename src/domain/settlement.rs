//! Oracle settlement payloads and candidate selection.
//!
//! The oracle signs `keccak256(abi.encode(tag, market_id, value,
//! price_timestamp))` as an EIP-191 personal message. The core recovers the
//! signing address and compares it to the configured oracle signer.

use alloy_primitives::{keccak256, Address, Signature, B256};
use alloy_sol_types::{sol, SolValue};
use serde::{Deserialize, Serialize};

use super::ids::MarketId;

/// Domain tag bound into every settlement payload.
pub const SETTLEMENT_TAG: &str = "CLMSR_SETTLEMENT";

sol! {
    /// ABI layout of the signed settlement payload.
    struct SettlementPayload {
        string tag;
        uint64 market_id;
        int64 settlement_value;
        uint64 price_timestamp;
    }
}

/// Digest the oracle signs for `(market_id, value, price_timestamp)`.
#[must_use]
pub fn settlement_digest(market_id: MarketId, value: i64, price_timestamp: u64) -> B256 {
    let payload = SettlementPayload {
        tag: SETTLEMENT_TAG.to_string(),
        market_id: market_id.value(),
        settlement_value: value,
        price_timestamp,
    };
    keccak256(payload.abi_encode())
}

/// Address that produced `signature` over the payload, or `None` if the
/// signature is malformed.
#[must_use]
pub fn recover_signer(
    market_id: MarketId,
    value: i64,
    price_timestamp: u64,
    signature: &[u8],
) -> Option<Address> {
    let signature = Signature::from_raw(signature).ok()?;
    let digest = settlement_digest(market_id, value, price_timestamp);
    signature.recover_address_from_msg(digest.as_slice()).ok()
}

/// Best oracle sample retained during the submission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCandidate {
    pub value: i64,
    pub price_timestamp: u64,
    /// `|price_timestamp - target|` in seconds.
    pub distance: u64,
}

impl SettlementCandidate {
    #[must_use]
    pub const fn new(value: i64, price_timestamp: u64, target: u64) -> Self {
        Self {
            value,
            price_timestamp,
            distance: price_timestamp.abs_diff(target),
        }
    }

    /// Strictly closer to the target, or equally close and earlier.
    #[must_use]
    pub const fn is_better_than(&self, other: &Self) -> bool {
        self.distance < other.distance
            || (self.distance == other.distance && self.price_timestamp < other.price_timestamp)
    }
}
