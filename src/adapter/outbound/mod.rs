//! Outbound adapters (driven side).

pub mod clock;
pub mod custody;
pub mod ledger;
pub mod oracle;

pub use clock::{ManualClock, SystemClock};
pub use custody::InMemoryCustody;
pub use ledger::InMemoryLedger;
pub use oracle::OracleSigner;
