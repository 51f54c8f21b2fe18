//! Pure CLMSR domain logic: fixed-point math, the range tree, markets,
//! positions and settlement payloads.

pub mod error;
pub mod ids;
pub mod limits;
pub mod market;
pub mod money;
pub mod position;
pub mod settlement;
pub mod tree;
pub mod wad;

pub use error::{MarketError, MathError, SettlementError, TreeError};
pub use ids::{MarketId, PositionId, Principal};
pub use limits::ProtocolLimits;
pub use market::{Market, MarketParams, MarketPhase, MarketView};
pub use money::{Amount, Quantity};
pub use position::Position;
pub use settlement::SettlementCandidate;
pub use tree::{FactorBounds, LazyRangeTree};
