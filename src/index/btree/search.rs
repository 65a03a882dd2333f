//! Lookups and scans.
//!
//! Every lookup descends to the leftmost leaf that may hold its key and
//! then walks the leaf chain, so keys equal to a separator and runs of
//! duplicates spanning several leaves are both found.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use super::{Ties, TreeIndex};
use crate::common::{Error, NodeOffset, RecordPosition, Result};
use crate::index::Key;
use crate::storage::node::{LeafEntry, LeafNode, Node};

impl TreeIndex {
    /// Position stored for `key`, or `None` if the key is absent.
    ///
    /// With duplicates, the oldest entry for `key` is returned.
    ///
    /// # Errors
    /// Returns `Error::Format` if `key` does not match the key type.
    pub fn search(&mut self, key: &Key) -> Result<Option<RecordPosition>> {
        let key = self.codec().normalize(key)?;
        Ok(self
            .locate(&key)?
            .map(|(_, leaf, idx)| leaf.entries[idx].position))
    }

    /// Every position stored for `key`, in insertion order.
    pub fn search_all(&mut self, key: &Key) -> Result<Vec<RecordPosition>> {
        let key = self.codec().normalize(key)?;
        let codec = self.codec();
        let mut positions = Vec::new();

        self.scan_from(&key, |entry| match codec.compare(&entry.key, &key) {
            Ordering::Less => ControlFlow::Continue(()),
            Ordering::Equal => {
                positions.push(entry.position);
                ControlFlow::Continue(())
            }
            Ordering::Greater => ControlFlow::Break(()),
        })?;
        Ok(positions)
    }

    /// Positions of all keys in `low..=high`, in ascending key order.
    ///
    /// An inverted range yields nothing.
    pub fn range_search(&mut self, low: &Key, high: &Key) -> Result<Vec<RecordPosition>> {
        Ok(self
            .range_entries(low, high)?
            .into_iter()
            .map(|(_, position)| position)
            .collect())
    }

    /// `(key, position)` pairs of all keys in `low..=high`.
    pub fn range_entries(&mut self, low: &Key, high: &Key) -> Result<Vec<(Key, RecordPosition)>> {
        let codec = self.codec();
        let low = codec.normalize(low)?;
        let high = codec.normalize(high)?;
        let mut found = Vec::new();
        if codec.compare(&low, &high) == Ordering::Greater {
            return Ok(found);
        }

        self.scan_from(&low, |entry| {
            if codec.compare(&entry.key, &high) == Ordering::Greater {
                return ControlFlow::Break(());
            }
            if codec.compare(&entry.key, &low) != Ordering::Less {
                found.push((entry.key.clone(), entry.position));
            }
            ControlFlow::Continue(())
        })?;
        Ok(found)
    }

    /// Every `(key, position)` pair in key order.
    pub fn entries(&mut self) -> Result<Vec<(Key, RecordPosition)>> {
        let mut all = Vec::new();
        if let Some(offset) = self.first_leaf()? {
            let leaf = self.store.read_leaf(offset)?;
            self.walk_chain(offset, leaf, |entry| {
                all.push((entry.key.clone(), entry.position));
                ControlFlow::Continue(())
            })?;
        }
        Ok(all)
    }

    /// Number of entries in the tree.
    pub fn len(&mut self) -> Result<usize> {
        let mut count = 0;
        if let Some(offset) = self.first_leaf()? {
            let leaf = self.store.read_leaf(offset)?;
            self.walk_chain(offset, leaf, |_| {
                count += 1;
                ControlFlow::Continue(())
            })?;
        }
        Ok(count)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of levels from root to leaf; 0 for an empty tree.
    pub fn height(&mut self) -> Result<usize> {
        let mut offset = self.store.root();
        let mut height = 0;
        while offset.is_valid() {
            height += 1;
            if height > self.depth_limit() {
                return Err(Error::corrupt(offset.as_u64(), "tree deeper than its node count"));
            }
            offset = match self.store.read_node(offset)? {
                Node::Leaf(_) => NodeOffset::NONE,
                Node::Internal(node) => node.children[0],
            };
        }
        Ok(height)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Leaf and index of the first entry equal to `key`.
    pub(super) fn locate(&mut self, key: &Key) -> Result<Option<(NodeOffset, LeafNode, usize)>> {
        let codec = self.codec();
        let Some((mut offset, mut leaf)) = self.descend(key, Ties::Left)? else {
            return Ok(None);
        };

        for _ in 0..self.chain_limit() {
            let idx = leaf.lower_bound(&codec, key);
            if let Some(entry) = leaf.entries.get(idx) {
                return Ok(match codec.compare(&entry.key, key) {
                    Ordering::Equal => Some((offset, leaf, idx)),
                    _ => None,
                });
            }
            if !leaf.next_leaf.is_valid() {
                return Ok(None);
            }
            offset = leaf.next_leaf;
            leaf = self.store.read_leaf(offset)?;
        }
        Err(Error::corrupt(offset.as_u64(), "leaf chain does not terminate"))
    }

    /// Visit entries in key order starting at the leaf that may hold `key`.
    fn scan_from<F>(&mut self, key: &Key, visit: F) -> Result<()>
    where
        F: FnMut(&LeafEntry) -> ControlFlow<()>,
    {
        match self.descend(key, Ties::Left)? {
            Some((offset, leaf)) => self.walk_chain(offset, leaf, visit),
            None => Ok(()),
        }
    }

    /// Visit entries from `leaf` onward along the leaf chain until `visit`
    /// breaks or the chain ends.
    fn walk_chain<F>(&mut self, mut offset: NodeOffset, mut leaf: LeafNode, mut visit: F) -> Result<()>
    where
        F: FnMut(&LeafEntry) -> ControlFlow<()>,
    {
        for _ in 0..self.chain_limit() {
            for entry in &leaf.entries {
                if visit(entry).is_break() {
                    return Ok(());
                }
            }
            if !leaf.next_leaf.is_valid() {
                return Ok(());
            }
            offset = leaf.next_leaf;
            leaf = self.store.read_leaf(offset)?;
        }
        Err(Error::corrupt(offset.as_u64(), "leaf chain does not terminate"))
    }
}
