//! Tree operation statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for node I/O and structural changes.
///
/// The tree is single-writer, but the counters are atomics so a shared
/// `&TreeStats` can be read while the owner keeps mutating through `&mut`.
/// All updates use `Ordering::Relaxed`; counters are independent.
///
/// # Example
/// ```
/// use bptree_index::TreeStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TreeStats::new();
/// stats.leaf_splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().leaf_splits, 1);
/// ```
#[derive(Debug)]
pub struct TreeStats {
    /// Nodes decoded from the node file.
    pub nodes_read: AtomicU64,

    /// Nodes rewritten in place.
    pub nodes_written: AtomicU64,

    /// Nodes appended at end of file.
    pub nodes_appended: AtomicU64,

    pub leaf_splits: AtomicU64,
    pub internal_splits: AtomicU64,
    pub leaf_merges: AtomicU64,
    pub internal_merges: AtomicU64,

    /// Entries or (key, child) pairs borrowed from a sibling.
    pub redistributions: AtomicU64,

    /// Internal roots replaced by their only child.
    pub root_collapses: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            nodes_read: AtomicU64::new(0),
            nodes_written: AtomicU64::new(0),
            nodes_appended: AtomicU64::new(0),
            leaf_splits: AtomicU64::new(0),
            internal_splits: AtomicU64::new(0),
            leaf_merges: AtomicU64::new(0),
            internal_merges: AtomicU64::new(0),
            redistributions: AtomicU64::new(0),
            root_collapses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            nodes_read: self.nodes_read.load(Ordering::Relaxed),
            nodes_written: self.nodes_written.load(Ordering::Relaxed),
            nodes_appended: self.nodes_appended.load(Ordering::Relaxed),
            leaf_splits: self.leaf_splits.load(Ordering::Relaxed),
            internal_splits: self.internal_splits.load(Ordering::Relaxed),
            leaf_merges: self.leaf_merges.load(Ordering::Relaxed),
            internal_merges: self.internal_merges.load(Ordering::Relaxed),
            redistributions: self.redistributions.load(Ordering::Relaxed),
            root_collapses: self.root_collapses.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.nodes_read,
            &self.nodes_written,
            &self.nodes_appended,
            &self.leaf_splits,
            &self.internal_splits,
            &self.leaf_merges,
            &self.internal_merges,
            &self.redistributions,
            &self.root_collapses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TreeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`TreeStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub nodes_read: u64,
    pub nodes_written: u64,
    pub nodes_appended: u64,
    pub leaf_splits: u64,
    pub internal_splits: u64,
    pub leaf_merges: u64,
    pub internal_merges: u64,
    pub redistributions: u64,
    pub root_collapses: u64,
}

impl StatsSnapshot {
    /// Total number of splits at any level.
    pub fn splits(&self) -> u64 {
        self.leaf_splits + self.internal_splits
    }

    /// Total number of merges at any level.
    pub fn merges(&self) -> u64 {
        self.leaf_merges + self.internal_merges
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ read: {}, written: {}, appended: {}, splits: {}, merges: {}, redistributions: {} }}",
            self.nodes_read,
            self.nodes_written,
            self.nodes_appended,
            self.splits(),
            self.merges(),
            self.redistributions
        )
    }
}
