//! Time source for lifecycle gates.

/// Supplies the current time as unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}
