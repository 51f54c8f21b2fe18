//! Lazy multiplicative segment tree over outcome bins.
//!
//! Every leaf holds a WAD weight that starts at `1.0`. Range updates
//! multiply weights by a factor; they never add. A node whose range is
//! fully covered by an update scales its cached sum and folds the factor
//! into its pending multiplier instead of visiting the children. Pending
//! multipliers compose by multiplication and are pushed one level down
//! whenever a later operation needs to look inside the node.
//!
//! Storage is a flat arena of two parallel vectors indexed by node
//! position. A node at `idx` covering `[l, r]` with `mid = (l + r) / 2`
//! has its left child at `idx + 1` and its right child at
//! `idx + 2 * (mid - l + 1)`, so `size` leaves use exactly `2 * size - 1`
//! slots.
//!
//! Mutations can be grouped with [`LazyRangeTree::atomically`]: if the
//! closure fails, every node written inside it is restored.
//!
//! # Examples
//!
//! ```
//! use alloy_primitives::U256;
//! use clmsr::domain::tree::LazyRangeTree;
//! use clmsr::domain::wad::WAD;
//!
//! let mut tree = LazyRangeTree::new();
//! tree.init(10).unwrap();
//! tree.update(5, WAD * U256::from(2)).unwrap();
//! tree.apply_range_factor(0, 4, WAD * U256::from(2)).unwrap();
//! assert_eq!(tree.get_total_sum().unwrap(), WAD * U256::from(16));
//! ```

use alloy_primitives::U256;

use super::error::TreeError;
use super::wad::{self, WAD};

/// Largest number of leaves a tree accepts.
pub const MAX_TREE_SIZE: usize = 1_000_000;

/// Inclusive bounds a single range factor must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorBounds {
    pub min: U256,
    pub max: U256,
}

impl FactorBounds {
    #[must_use]
    pub const fn new(min: U256, max: U256) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, factor: U256) -> bool {
        factor >= self.min && factor <= self.max
    }

    /// Reject `factor` with [`TreeError::InvalidFactor`] if out of bounds.
    pub fn check(&self, factor: U256) -> Result<(), TreeError> {
        if self.contains(factor) {
            Ok(())
        } else {
            Err(TreeError::InvalidFactor {
                factor,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct JournalEntry {
    node: usize,
    sum: U256,
    pending: U256,
}

/// Multiplicative range tree with lazy propagation.
#[derive(Debug, Clone, Default)]
pub struct LazyRangeTree {
    size: usize,
    sum: Vec<U256>,
    pending: Vec<U256>,
    bounds: Option<FactorBounds>,
    journal: Option<Vec<JournalEntry>>,
}

impl LazyRangeTree {
    /// Create an uninitialized tree that accepts any positive factor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an uninitialized tree that rejects factors outside `bounds`.
    #[must_use]
    pub fn with_bounds(bounds: FactorBounds) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    /// Allocate `size` leaves at weight `1.0`.
    pub fn init(&mut self, size: usize) -> Result<(), TreeError> {
        if self.size != 0 {
            return Err(TreeError::TreeAlreadyInitialized);
        }
        if size == 0 {
            return Err(TreeError::TreeSizeZero);
        }
        if size > MAX_TREE_SIZE {
            return Err(TreeError::TreeSizeTooLarge {
                size,
                max: MAX_TREE_SIZE,
            });
        }

        let nodes = 2 * size - 1;
        self.sum = vec![U256::ZERO; nodes];
        self.pending = vec![WAD; nodes];
        self.size = size;
        self.build(0, 0, size - 1);
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.size != 0
    }

    /// Number of leaves (zero before [`init`](Self::init)).
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn bounds(&self) -> Option<FactorBounds> {
        self.bounds
    }

    /// Set leaf `index` to `value`, bypassing the multiplicative model.
    pub fn update(&mut self, index: usize, value: U256) -> Result<(), TreeError> {
        self.require_initialized()?;
        if index >= self.size {
            return Err(TreeError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        let last = self.size - 1;
        self.atomically(|tree| tree.update_node(0, 0, last, index, value))
    }

    /// Multiply every leaf in `[lo, hi]` by `factor / WAD`.
    pub fn apply_range_factor(
        &mut self,
        lo: usize,
        hi: usize,
        factor: U256,
    ) -> Result<(), TreeError> {
        self.require_initialized()?;
        self.check_range(lo, hi)?;
        if factor.is_zero() {
            return Err(TreeError::InvalidFactor {
                factor,
                min: self.bounds.map_or(U256::from(1), |b| b.min),
                max: self.bounds.map_or(U256::MAX, |b| b.max),
            });
        }
        if let Some(bounds) = self.bounds {
            bounds.check(factor)?;
        }
        let last = self.size - 1;
        self.atomically(|tree| tree.apply_node(0, 0, last, lo, hi, factor))
    }

    /// `Σ` leaf weights over `[lo, hi]`.
    ///
    /// Descends exactly as a flushing read would: each pending multiplier
    /// met on the way is applied to the child values with the same
    /// rounding a push-down would use, without writing it back. Reads are
    /// therefore repeatable and agree with whatever a later write
    /// materializes.
    pub fn get_range_sum(&self, lo: usize, hi: usize) -> Result<U256, TreeError> {
        self.require_initialized()?;
        self.check_range(lo, hi)?;
        self.query_node(0, 0, self.size - 1, lo, hi, WAD)
    }

    /// Sum of every leaf; always the root's cached sum.
    pub fn get_total_sum(&self) -> Result<U256, TreeError> {
        self.require_initialized()?;
        Ok(self.sum[0])
    }

    /// Weight of a single leaf.
    pub fn leaf(&self, index: usize) -> Result<U256, TreeError> {
        self.get_range_sum(index, index)
    }

    /// Run `f` so that the tree is restored if it returns an error.
    ///
    /// Nested calls join the outermost scope.
    pub fn atomically<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        if self.journal.is_some() {
            return f(self);
        }
        self.journal = Some(Vec::new());
        let result = f(self);
        let journal = self.journal.take().unwrap_or_default();
        if result.is_err() {
            for entry in journal.into_iter().rev() {
                self.sum[entry.node] = entry.sum;
                self.pending[entry.node] = entry.pending;
            }
        }
        result
    }

    fn require_initialized(&self) -> Result<(), TreeError> {
        if self.size == 0 {
            Err(TreeError::TreeNotInitialized)
        } else {
            Ok(())
        }
    }

    fn check_range(&self, lo: usize, hi: usize) -> Result<(), TreeError> {
        if lo > hi {
            return Err(TreeError::InvalidRange { lo, hi });
        }
        if hi >= self.size {
            return Err(TreeError::IndexOutOfBounds {
                index: hi,
                size: self.size,
            });
        }
        Ok(())
    }

    fn children(node: usize, l: usize, r: usize) -> (usize, usize, usize) {
        let mid = l + (r - l) / 2;
        (mid, node + 1, node + 2 * (mid - l + 1))
    }

    fn build(&mut self, node: usize, l: usize, r: usize) {
        self.sum[node] = U256::from(r - l + 1) * WAD;
        if l == r {
            return;
        }
        let (mid, left, right) = Self::children(node, l, r);
        self.build(left, l, mid);
        self.build(right, mid + 1, r);
    }

    fn write(&mut self, node: usize, sum: U256, pending: U256) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(JournalEntry {
                node,
                sum: self.sum[node],
                pending: self.pending[node],
            });
        }
        self.sum[node] = sum;
        self.pending[node] = pending;
    }

    fn scale(&mut self, node: usize, is_leaf: bool, factor: U256) -> Result<(), TreeError> {
        let sum = wad::mul(self.sum[node], factor)?;
        let pending = if is_leaf {
            WAD
        } else {
            wad::mul(self.pending[node], factor)?
        };
        self.write(node, sum, pending);
        Ok(())
    }

    fn push_down(&mut self, node: usize, l: usize, r: usize) -> Result<(), TreeError> {
        let factor = self.pending[node];
        if factor == WAD {
            return Ok(());
        }
        let (mid, left, right) = Self::children(node, l, r);
        self.scale(left, l == mid, factor)?;
        self.scale(right, mid + 1 == r, factor)?;
        let sum = self.sum[node];
        self.write(node, sum, WAD);
        Ok(())
    }

    fn pull_up(&mut self, node: usize, left: usize, right: usize) -> Result<(), TreeError> {
        let sum = wad::add(self.sum[left], self.sum[right])?;
        let pending = self.pending[node];
        self.write(node, sum, pending);
        Ok(())
    }

    fn apply_node(
        &mut self,
        node: usize,
        l: usize,
        r: usize,
        lo: usize,
        hi: usize,
        factor: U256,
    ) -> Result<(), TreeError> {
        if hi < l || r < lo {
            return Ok(());
        }
        if lo <= l && r <= hi {
            return self.scale(node, l == r, factor);
        }
        self.push_down(node, l, r)?;
        let (mid, left, right) = Self::children(node, l, r);
        self.apply_node(left, l, mid, lo, hi, factor)?;
        self.apply_node(right, mid + 1, r, lo, hi, factor)?;
        self.pull_up(node, left, right)
    }

    fn update_node(
        &mut self,
        node: usize,
        l: usize,
        r: usize,
        index: usize,
        value: U256,
    ) -> Result<(), TreeError> {
        if l == r {
            self.write(node, value, WAD);
            return Ok(());
        }
        self.push_down(node, l, r)?;
        let (mid, left, right) = Self::children(node, l, r);
        if index <= mid {
            self.update_node(left, l, mid, index, value)?;
        } else {
            self.update_node(right, mid + 1, r, index, value)?;
        }
        self.pull_up(node, left, right)
    }

    fn query_node(
        &self,
        node: usize,
        l: usize,
        r: usize,
        lo: usize,
        hi: usize,
        inherited: U256,
    ) -> Result<U256, TreeError> {
        if hi < l || r < lo {
            return Ok(U256::ZERO);
        }
        let (sum, pending) = if inherited == WAD {
            (self.sum[node], self.pending[node])
        } else if l == r {
            (wad::mul(self.sum[node], inherited)?, WAD)
        } else {
            (
                wad::mul(self.sum[node], inherited)?,
                wad::mul(self.pending[node], inherited)?,
            )
        };
        if lo <= l && r <= hi {
            return Ok(sum);
        }
        let (mid, left, right) = Self::children(node, l, r);
        let left_sum = self.query_node(left, l, mid, lo, hi, pending)?;
        let right_sum = self.query_node(right, mid + 1, r, lo, hi, pending)?;
        Ok(wad::add(left_sum, right_sum)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wad::from_u128;

    fn w(n: u64) -> U256 {
        WAD * U256::from(n)
    }

    fn tree(size: usize) -> LazyRangeTree {
        let mut tree = LazyRangeTree::new();
        tree.init(size).unwrap();
        tree
    }

    #[test]
    fn init_sets_unit_weights() {
        let tree = tree(10);
        assert_eq!(tree.get_total_sum().unwrap(), w(10));
        assert_eq!(tree.leaf(7).unwrap(), WAD);
        assert_eq!(tree.size(), 10);
    }

    #[test]
    fn init_rejects_zero_and_double_init() {
        let mut tree = LazyRangeTree::new();
        assert_eq!(tree.init(0), Err(TreeError::TreeSizeZero));
        tree.init(4).unwrap();
        assert_eq!(tree.init(4), Err(TreeError::TreeAlreadyInitialized));
    }

    #[test]
    fn init_rejects_oversized_trees() {
        let mut tree = LazyRangeTree::new();
        assert_eq!(
            tree.init(MAX_TREE_SIZE + 1),
            Err(TreeError::TreeSizeTooLarge {
                size: MAX_TREE_SIZE + 1,
                max: MAX_TREE_SIZE,
            })
        );
    }

    #[test]
    fn operations_before_init_fail() {
        let mut tree = LazyRangeTree::new();
        assert_eq!(tree.get_total_sum(), Err(TreeError::TreeNotInitialized));
        assert_eq!(tree.get_range_sum(0, 0), Err(TreeError::TreeNotInitialized));
        assert_eq!(tree.update(0, WAD), Err(TreeError::TreeNotInitialized));
        assert_eq!(
            tree.apply_range_factor(0, 0, WAD),
            Err(TreeError::TreeNotInitialized)
        );
    }

    #[test]
    fn update_then_range_factor_scenario() {
        let mut tree = tree(10);
        tree.update(5, w(2)).unwrap();
        assert_eq!(tree.get_total_sum().unwrap(), w(11));
        tree.apply_range_factor(0, 4, w(2)).unwrap();
        assert_eq!(tree.get_total_sum().unwrap(), w(16));
        assert_eq!(tree.get_range_sum(0, 4).unwrap(), w(10));
        assert_eq!(tree.leaf(5).unwrap(), w(2));
        assert_eq!(tree.get_range_sum(6, 9).unwrap(), w(4));
    }

    #[test]
    fn out_of_bounds_indices_are_rejected() {
        let mut tree = tree(4);
        assert_eq!(
            tree.update(4, WAD),
            Err(TreeError::IndexOutOfBounds { index: 4, size: 4 })
        );
        assert_eq!(
            tree.apply_range_factor(1, 4, w(2)),
            Err(TreeError::IndexOutOfBounds { index: 4, size: 4 })
        );
        assert_eq!(
            tree.get_range_sum(3, 1),
            Err(TreeError::InvalidRange { lo: 3, hi: 1 })
        );
    }

    #[test]
    fn pending_factors_compose_multiplicatively() {
        let mut tree = tree(8);
        tree.apply_range_factor(0, 7, w(2)).unwrap();
        tree.apply_range_factor(0, 7, w(3)).unwrap();
        // root pending is 6, not 5
        assert_eq!(tree.get_total_sum().unwrap(), w(48));
        assert_eq!(tree.leaf(3).unwrap(), w(6));
    }

    #[test]
    fn partial_update_flushes_pending_into_children() {
        let mut tree = tree(8);
        tree.apply_range_factor(0, 7, w(2)).unwrap();
        tree.apply_range_factor(2, 5, w(3)).unwrap();
        assert_eq!(tree.get_range_sum(0, 1).unwrap(), w(4));
        assert_eq!(tree.get_range_sum(2, 5).unwrap(), w(24));
        assert_eq!(tree.get_range_sum(6, 7).unwrap(), w(4));
        assert_eq!(tree.get_total_sum().unwrap(), w(32));
    }

    #[test]
    fn point_update_inside_scaled_range_keeps_neighbours() {
        let mut tree = tree(6);
        tree.apply_range_factor(0, 5, w(2)).unwrap();
        tree.update(2, WAD).unwrap();
        assert_eq!(tree.leaf(1).unwrap(), w(2));
        assert_eq!(tree.leaf(2).unwrap(), WAD);
        assert_eq!(tree.get_total_sum().unwrap(), w(11));
    }

    #[test]
    fn zero_factor_is_rejected() {
        let mut tree = tree(3);
        assert!(matches!(
            tree.apply_range_factor(0, 2, U256::ZERO),
            Err(TreeError::InvalidFactor { .. })
        ));
    }

    #[test]
    fn configured_bounds_reject_out_of_range_factors() {
        let bounds = FactorBounds::new(
            from_u128(100_000_000_000_000),
            from_u128(10_000_000_000_000_000_000_000),
        );
        let mut tree = LazyRangeTree::with_bounds(bounds);
        tree.init(4).unwrap();
        let too_big = w(10_001);
        assert_eq!(
            tree.apply_range_factor(0, 3, too_big),
            Err(TreeError::InvalidFactor {
                factor: too_big,
                min: bounds.min,
                max: bounds.max,
            })
        );
        tree.apply_range_factor(0, 3, w(10_000)).unwrap();
        assert_eq!(tree.get_total_sum().unwrap(), w(40_000));
    }

    #[test]
    fn atomically_rolls_back_on_error() {
        let mut tree = tree(8);
        tree.apply_range_factor(0, 3, w(2)).unwrap();
        let before: Vec<U256> = (0..8).map(|i| tree.leaf(i).unwrap()).collect();

        let result: Result<(), TreeError> = tree.atomically(|t| {
            t.apply_range_factor(2, 6, w(5))?;
            t.update(7, w(9))?;
            t.apply_range_factor(0, 9, w(2))
        });
        assert!(result.is_err());

        let after: Vec<U256> = (0..8).map(|i| tree.leaf(i).unwrap()).collect();
        assert_eq!(before, after);
        assert_eq!(tree.get_total_sum().unwrap(), w(12));
    }

    #[test]
    fn atomically_keeps_successful_writes() {
        let mut tree = tree(4);
        tree.atomically(|t| {
            t.apply_range_factor(0, 1, w(3))?;
            t.apply_range_factor(1, 3, w(2))
        })
        .unwrap();
        assert_eq!(tree.get_total_sum().unwrap(), w(3 + 6 + 2 + 2));
    }

    #[test]
    fn reads_are_repeatable_under_pending_state() {
        let mut tree = tree(16);
        let third = from_u128(333_333_333_333_333_333);
        tree.apply_range_factor(0, 15, third).unwrap();
        tree.apply_range_factor(0, 7, w(7)).unwrap();
        let first = tree.get_range_sum(3, 12).unwrap();
        let second = tree.get_range_sum(3, 12).unwrap();
        assert_eq!(first, second);

        tree.apply_range_factor(14, 15, w(3)).unwrap();
        assert_eq!(tree.get_range_sum(3, 12).unwrap(), first);
    }
}
