use thiserror::Error;

use crate::domain::error::{MarketError, MathError, SettlementError, TreeError};
use crate::domain::ids::{PositionId, Principal};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Caller identity rejected by the allow-list or by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("principal {principal} is not authorized")]
    Unauthorized { principal: Principal },
}

/// Failures reported by the position ledger or payment custody.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("principal {principal} holds {balance}, needs {needed}")]
    InsufficientBalance {
        principal: Principal,
        balance: u128,
        needed: u128,
    },

    #[error("ledger has no position {0}")]
    UnknownPosition(PositionId),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A trade failed and the transfer undoing its payment failed too;
    /// custody and ledger disagree until reconciled.
    #[error("{cause}; compensating transfer failed: {compensation}")]
    CompensationFailed {
        cause: Box<Error>,
        #[source]
        compensation: Box<Error>,
    },

    #[error("signing error: {0}")]
    Signing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn compensation_failed(cause: Error, compensation: Error) -> Self {
        Error::CompensationFailed {
            cause: Box::new(cause),
            compensation: Box::new(compensation),
        }
    }
}

impl From<alloy_signer::Error> for Error {
    fn from(err: alloy_signer::Error) -> Self {
        Error::Signing(err.to_string())
    }
}
