//! Administrative allow-list and the core-wide pause switch.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::domain::{MarketError, Principal};
use crate::error::AccessError;

#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    admins: BTreeSet<Principal>,
    paused: bool,
}

impl AccessControl {
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            paused: false,
        }
    }

    #[must_use]
    pub fn is_admin(&self, principal: &Principal) -> bool {
        self.admins.contains(principal)
    }

    #[must_use]
    pub fn admins(&self) -> Vec<Principal> {
        self.admins.iter().copied().collect()
    }

    pub fn require_admin(&self, caller: &Principal) -> Result<(), AccessError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            warn!(principal = %caller, "Rejected administrative call");
            Err(AccessError::Unauthorized { principal: *caller })
        }
    }

    /// Add `principal` to the allow-list. Granting twice is a no-op.
    pub fn grant(&mut self, caller: &Principal, principal: Principal) -> Result<(), AccessError> {
        self.require_admin(caller)?;
        if self.admins.insert(principal) {
            info!(principal = %principal, granted_by = %caller, "Admin granted");
        }
        Ok(())
    }

    /// Remove `principal` from the allow-list. An admin may revoke itself.
    pub fn revoke(&mut self, caller: &Principal, principal: &Principal) -> Result<(), AccessError> {
        self.require_admin(caller)?;
        if self.admins.remove(principal) {
            info!(principal = %principal, revoked_by = %caller, "Admin revoked");
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn require_not_paused(&self) -> Result<(), MarketError> {
        if self.paused {
            Err(MarketError::Paused)
        } else {
            Ok(())
        }
    }

    /// Caller must already be authorized.
    pub fn pause(&mut self) -> Result<(), MarketError> {
        if self.paused {
            return Err(MarketError::AlreadyPaused);
        }
        self.paused = true;
        Ok(())
    }

    /// Caller must already be authorized.
    pub fn unpause(&mut self) -> Result<(), MarketError> {
        if !self.paused {
            return Err(MarketError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn admin() -> Principal {
        Principal::new(Address::with_last_byte(1))
    }

    fn user() -> Principal {
        Principal::new(Address::with_last_byte(2))
    }

    #[test]
    fn only_admins_pass() {
        let access = AccessControl::new([admin()]);
        assert!(access.require_admin(&admin()).is_ok());
        assert_eq!(
            access.require_admin(&user()),
            Err(AccessError::Unauthorized { principal: user() })
        );
    }

    #[test]
    fn grant_and_revoke() {
        let mut access = AccessControl::new([admin()]);
        assert!(access.grant(&user(), user()).is_err());
        access.grant(&admin(), user()).unwrap();
        assert!(access.is_admin(&user()));
        access.revoke(&user(), &admin()).unwrap();
        assert_eq!(access.admins(), vec![user()]);
    }

    #[test]
    fn pause_is_strict() {
        let mut access = AccessControl::default();
        assert_eq!(access.unpause(), Err(MarketError::NotPaused));
        access.pause().unwrap();
        assert_eq!(access.require_not_paused(), Err(MarketError::Paused));
        assert_eq!(access.pause(), Err(MarketError::AlreadyPaused));
        access.unpause().unwrap();
        assert!(!access.is_paused());
    }
}
