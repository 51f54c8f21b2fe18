//! Oracle configuration.

use alloy_primitives::Address;
use serde::Deserialize;

/// `[oracle]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OracleConfig {
    /// Address whose settlement signatures are accepted.
    pub signer: Option<Address>,

    /// Key used by `sign-settlement`.
    ///
    /// Loaded from `ORACLE_PRIVATE_KEY`, never from the config file.
    #[serde(skip)]
    pub private_key: Option<String>,
}
