//! CLMSR - a continuous LMSR market maker over tick ranges.
//!
//! A market splits an integer outcome range into bins of equal width.
//! Positions buy exposure to a contiguous run of bins and pay one unit per
//! unit of quantity if the settled outcome lands inside it.
//!
//! # Architecture
//!
//! - [`domain`] - Pure logic: WAD fixed point, the lazy multiplicative
//!   range tree, markets, positions and settlement payloads
//! - [`application`] - The [`MarketCore`](application::MarketCore) service,
//!   chunked pricing, access control and the settlement state machine
//! - [`port`] - Traits for the clock, position ledger and payment custody
//! - [`adapter`] - In-memory collaborators, the oracle signer and the CLI
//! - [`infrastructure`] - Configuration, logging and wiring
//! - [`error`] - Crate-wide error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clmsr::adapter::outbound::ManualClock;
//! use clmsr::domain::{wad, MarketParams};
//! use clmsr::infrastructure::bootstrap::build_in_memory;
//! use clmsr::infrastructure::config::Config;
//!
//! # fn main() -> clmsr::error::Result<()> {
//! let config = Config::parse_toml("")?;
//! let deployment = build_in_memory(&config, Arc::new(ManualClock::new(0)))?;
//! let params = MarketParams {
//!     id: None,
//!     min_tick: 0,
//!     max_tick: 100,
//!     tick_spacing: 10,
//!     start_timestamp: 0,
//!     end_timestamp: 3_600,
//!     settlement_timestamp: None,
//!     alpha: wad::WAD,
//! };
//! let market = deployment.core.create_market(&deployment.operator, &params)?;
//! let cost = deployment.core.calculate_open_cost(market, 20, 40, 1_000_000)?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
