//! Infrastructure configuration modules.

pub mod access;
pub mod logging;
pub mod oracle;
pub mod protocol;
pub mod settings;

pub use settings::Config;
