//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The core owns markets and trees; everything else it touches goes
//! through these traits:
//!
//! - [`Clock`] - ambient time used by every timestamp gate
//! - [`PositionLedger`] - ownership bookkeeping for positions
//! - [`PaymentCustody`] - payment-token pulls and pushes
//!
//! Mutating collaborator calls carry the caller's [`Principal`] and must be
//! rejected unless it is the core's own principal.
//!
//! [`Principal`]: crate::domain::Principal

pub mod outbound;

pub use outbound::clock::Clock;
pub use outbound::custody::PaymentCustody;
pub use outbound::ledger::PositionLedger;
