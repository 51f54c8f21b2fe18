//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; the oracle private key comes
//! from the `ORACLE_PRIVATE_KEY` environment variable.
//!
//! # Example
//!
//! ```no_run
//! use clmsr::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     let limits = config.limits()?;
//!     println!("max chunks per trade: {}", limits.max_chunks_per_tx);
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::access::AccessConfig;
use super::logging::LoggingConfig;
use super::oracle::OracleConfig;
use super::protocol::ProtocolConfig;
use crate::domain::ProtocolLimits;
use crate::error::{ConfigError, Result};

/// Environment variable holding the oracle signing key.
pub const ORACLE_PRIVATE_KEY_ENV: &str = "ORACLE_PRIVATE_KEY";

/// Main application configuration.
///
/// Every section is optional; an empty file yields the protocol defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Numeric limits and settlement timing.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub access: AccessConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        // Never from the config file
        config.oracle.private_key = std::env::var(ORACLE_PRIVATE_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or [`Config::parse_toml`]
    /// fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        self.protocol.limits()?;
        if let Some(core) = self.access.core {
            if self.access.admins.contains(&core) {
                return Err(ConfigError::InvalidValue {
                    field: "access.core",
                    reason: "the core principal cannot also be an admin".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Protocol limits in WAD form.
    pub fn limits(&self) -> Result<ProtocolLimits> {
        self.protocol.limits()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::logging::LogFormat;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.limits().unwrap(), ProtocolLimits::default());
        assert!(config.access.admins.is_empty());
    }

    #[test]
    fn parses_every_section() {
        let toml = r#"
            [logging]
            level = "debug"
            format = "json"

            [protocol]
            max_chunks_per_tx = 10
            min_factor = "0.01"
            max_factor = "100"

            [oracle]
            signer = "0x00000000000000000000000000000000000000aa"

            [access]
            admins = ["0x0000000000000000000000000000000000000001"]
            core = "0x00000000000000000000000000000000000000c0"
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.limits().unwrap().max_chunks_per_tx, 10);
        assert!(config.oracle.signer.is_some());
        assert_eq!(config.access.admins.len(), 1);
    }

    #[test]
    fn rejects_core_listed_as_admin() {
        let toml = r#"
            [access]
            admins = ["0x00000000000000000000000000000000000000c0"]
            core = "0x00000000000000000000000000000000000000c0"
        "#;
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::parse_toml("[protocol"),
            Err(crate::error::Error::Config(ConfigError::Parse(_)))
        ));
    }
}
