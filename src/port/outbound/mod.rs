//! Outbound ports the core calls into.

pub mod clock;
pub mod custody;
pub mod ledger;
