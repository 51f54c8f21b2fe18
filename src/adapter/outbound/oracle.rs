//! Oracle signer for settlement payloads.

use std::str::FromStr;

use alloy_primitives::{Address, Bytes};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use crate::domain::settlement::settlement_digest;
use crate::domain::MarketId;
use crate::error::{ConfigError, Result};

/// Signs settlement payloads with a local secp256k1 key.
#[derive(Debug, Clone)]
pub struct OracleSigner {
    signer: PrivateKeySigner,
}

impl OracleSigner {
    /// Parse a hex private key (with or without `0x`).
    pub fn from_private_key(key: &str) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "ORACLE_PRIVATE_KEY",
            }
            .into());
        }
        let signer = PrivateKeySigner::from_str(key.trim()).map_err(|e| ConfigError::InvalidValue {
            field: "ORACLE_PRIVATE_KEY",
            reason: e.to_string(),
        })?;
        Ok(Self { signer })
    }

    /// Fresh random key; for tests and local simulation.
    #[must_use]
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// 65-byte `r || s || v` signature over the settlement digest.
    pub fn sign_settlement(
        &self,
        market_id: MarketId,
        value: i64,
        price_timestamp: u64,
    ) -> Result<Bytes> {
        let digest = settlement_digest(market_id, value, price_timestamp);
        let signature = self.signer.sign_message_sync(digest.as_slice())?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settlement::recover_signer;
    use crate::error::Error;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn signature_recovers_to_signer() {
        let oracle = OracleSigner::from_private_key(KEY).unwrap();
        let signature = oracle.sign_settlement(MarketId::new(3), 120_010, 1_700).unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(
            recover_signer(MarketId::new(3), 120_010, 1_700, &signature),
            Some(oracle.address())
        );
    }

    #[test]
    fn signature_does_not_transfer_to_other_payload() {
        let oracle = OracleSigner::random();
        let signature = oracle.sign_settlement(MarketId::new(3), 1, 1_700).unwrap();
        assert_ne!(
            recover_signer(MarketId::new(3), 2, 1_700, &signature),
            Some(oracle.address())
        );
    }

    #[test]
    fn empty_key_is_missing() {
        assert!(matches!(
            OracleSigner::from_private_key("  "),
            Err(Error::Config(ConfigError::MissingField { .. }))
        ));
    }
}
