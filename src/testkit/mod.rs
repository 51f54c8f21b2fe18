//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for market parameters and timeline constants.
//! - [`harness`] - [`TestHarness`](harness::TestHarness): a core wired to a
//!   manual clock, in-memory collaborators and a random oracle key.

pub mod domain;
pub mod harness;

pub use harness::TestHarness;
