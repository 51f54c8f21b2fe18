//! Access-control configuration.

use serde::Deserialize;

use crate::domain::Principal;

/// `[access]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfig {
    /// Principals allowed to run administrative calls.
    #[serde(default)]
    pub admins: Vec<Principal>,

    /// Identity the core presents to its collaborators.
    pub core: Option<Principal>,
}
