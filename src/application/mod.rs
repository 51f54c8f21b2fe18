//! Application services (use cases).
//!
//! [`MarketCore`] is the entry point; the other services are the pieces it
//! orchestrates and are usable on their own for previews and tests.

pub mod access;
pub mod core;
pub mod pricing;
pub mod settlement;

pub use self::core::{MarketCore, MarketCoreBuilder};
pub use access::AccessControl;
pub use pricing::{ChunkStep, PricingEngine, TradeDirection, TradeQuote};
pub use settlement::{SettlementMachine, Submission};
