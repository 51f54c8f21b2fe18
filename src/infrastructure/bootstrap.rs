//! Composition root: wires a [`MarketCore`] to in-memory collaborators.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::adapter::outbound::{InMemoryCustody, InMemoryLedger};
use crate::application::MarketCore;
use crate::domain::Principal;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::Clock;

/// Principal used for administration when the config lists no admins.
pub const LOCAL_OPERATOR: Principal = Principal::new(Address::repeat_byte(0x01));

/// Core identity when `access.core` is unset.
pub const DEFAULT_CORE: Principal = Principal::new(Address::repeat_byte(0xc0));

/// A core plus handles to the collaborators it was built with.
pub struct InMemoryDeployment {
    pub core: MarketCore,
    pub ledger: Arc<InMemoryLedger>,
    pub custody: Arc<InMemoryCustody>,
    /// First configured admin, or [`LOCAL_OPERATOR`].
    pub operator: Principal,
}

/// Build a deployment from `config`, reading time from `clock`.
pub fn build_in_memory(config: &Config, clock: Arc<dyn Clock>) -> Result<InMemoryDeployment> {
    let limits = config.limits()?;
    let principal = config.access.core.unwrap_or(DEFAULT_CORE);

    let mut admins = config.access.admins.clone();
    if admins.is_empty() {
        info!(operator = %LOCAL_OPERATOR, "No admins configured, using local operator");
        admins.push(LOCAL_OPERATOR);
    }
    let operator = admins[0];

    let oracle_signer = config.oracle.signer.unwrap_or_else(|| {
        warn!("oracle.signer not configured, settlement submissions will be rejected");
        Address::ZERO
    });

    let ledger = Arc::new(InMemoryLedger::new(principal));
    let custody = Arc::new(InMemoryCustody::new(principal));
    let core = MarketCore::builder()
        .principal(principal)
        .limits(limits)
        .oracle_signer(oracle_signer)
        .admins(admins)
        .clock(clock)
        .ledger(ledger.clone())
        .custody(custody.clone())
        .build()?;

    Ok(InMemoryDeployment {
        core,
        ledger,
        custody,
        operator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::ManualClock;

    #[test]
    fn empty_config_gets_local_operator() {
        let config = Config::parse_toml("").unwrap();
        let deployment = build_in_memory(&config, Arc::new(ManualClock::new(0))).unwrap();
        assert_eq!(deployment.operator, LOCAL_OPERATOR);
        assert!(deployment.core.is_admin(&LOCAL_OPERATOR));
        assert_eq!(deployment.core.principal(), DEFAULT_CORE);
        assert_eq!(deployment.core.oracle_signer(), Address::ZERO);
    }
}
