//! Deletion with redistribution, merging and root collapse.
//!
//! An underflowing node first borrows one entry from its left sibling, then
//! from its right sibling. When neither can lend it merges with its right
//! sibling, or with its left sibling if it is the last child. A merge takes
//! a key out of the parent, so underflow can cascade up to the root; a root
//! left with no keys is replaced by its only child.

use std::cmp::Ordering;

use tracing::debug;

use super::TreeIndex;
use crate::common::{Error, NodeOffset, RecordPosition, Result, TreeStats};
use crate::index::Key;
use crate::storage::node::{InternalNode, LeafNode};

impl TreeIndex {
    /// Delete one entry for `key`. Returns `false` if the key is absent, in
    /// which case nothing is written.
    pub fn delete(&mut self, key: &Key) -> Result<bool> {
        Ok(self.remove(key)?.is_some())
    }

    /// Delete one entry for `key` and return its record position.
    ///
    /// With duplicates, the oldest entry for `key` is removed.
    pub fn remove(&mut self, key: &Key) -> Result<Option<RecordPosition>> {
        let key = self.codec().normalize(key)?;
        let Some((offset, mut leaf, idx)) = self.locate(&key)? else {
            return Ok(None);
        };

        let removed = leaf.entries.remove(idx);
        self.store.write_leaf(offset, &leaf)?;

        if leaf.parent.is_valid() && leaf.n_keys() < self.min_keys() {
            self.handle_leaf_underflow(offset, leaf, &removed.key)?;
        }
        Ok(Some(removed.position))
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn handle_leaf_underflow(
        &mut self,
        offset: NodeOffset,
        mut leaf: LeafNode,
        deleted: &Key,
    ) -> Result<()> {
        let parent_offset = leaf.parent;
        let mut parent = self.store.read_internal(parent_offset)?;
        let idx = child_position(&parent, parent_offset, offset)?;
        let min = self.min_keys();

        if idx > 0 {
            let left_offset = parent.children[idx - 1];
            let mut left = self.store.read_leaf(left_offset)?;
            if left.n_keys() > min {
                let moved = pop_last(&mut left.entries, left_offset)?;
                parent.keys[idx - 1] = moved.key.clone();
                leaf.entries.insert(0, moved);

                self.store.write_leaf(left_offset, &left)?;
                self.store.write_leaf(offset, &leaf)?;
                self.store.write_internal(parent_offset, &parent)?;
                TreeStats::bump(&self.store.stats().redistributions);
                debug!(from = %left_offset, to = %offset, "borrowed from left leaf");
                return Ok(());
            }
        }

        if idx + 1 < parent.children.len() {
            let right_offset = parent.children[idx + 1];
            let mut right = self.store.read_leaf(right_offset)?;
            if right.n_keys() > min {
                let was_empty = leaf.entries.is_empty();
                leaf.entries.push(right.entries.remove(0));
                self.store.write_leaf(right_offset, &right)?;
                self.store.write_leaf(offset, &leaf)?;

                if was_empty {
                    let first = first_key(&leaf, offset)?;
                    self.change_delete_key(offset, parent_offset, deleted, &first)?;
                    parent = self.store.read_internal(parent_offset)?;
                }
                parent.keys[idx] = first_key(&right, right_offset)?;
                self.store.write_internal(parent_offset, &parent)?;
                TreeStats::bump(&self.store.stats().redistributions);
                debug!(from = %right_offset, to = %offset, "borrowed from right leaf");
                return Ok(());
            }
        }

        let left_idx = merge_position(idx, parent.children.len(), parent_offset)?;
        self.merge_leaves(&mut parent, left_idx)?;
        self.store.write_internal(parent_offset, &parent)?;
        self.rebalance_internal(parent_offset, parent)
    }

    /// Merge `children[left_idx + 1]` into `children[left_idx]`.
    fn merge_leaves(&mut self, parent: &mut InternalNode, left_idx: usize) -> Result<()> {
        let left_offset = parent.children[left_idx];
        let right_offset = parent.children[left_idx + 1];
        let mut left = self.store.read_leaf(left_offset)?;
        let right = self.store.read_leaf(right_offset)?;

        left.entries.extend(right.entries);
        left.next_leaf = right.next_leaf;
        self.store.write_leaf(left_offset, &left)?;

        parent.keys.remove(left_idx);
        parent.children.remove(left_idx + 1);

        TreeStats::bump(&self.store.stats().leaf_merges);
        debug!(into = %left_offset, from = %right_offset, "merged leaves");
        Ok(())
    }

    /// Replace the separator that bounds the leaf at `leaf_offset` from
    /// below, if it still equals the deleted key.
    ///
    /// That separator sits in the lowest ancestor where the leaf's subtree
    /// is not the leftmost child.
    fn change_delete_key(
        &mut self,
        leaf_offset: NodeOffset,
        parent_offset: NodeOffset,
        old: &Key,
        new: &Key,
    ) -> Result<()> {
        let codec = self.codec();
        let mut child = leaf_offset;
        let mut current = parent_offset;

        for _ in 0..self.depth_limit() {
            if !current.is_valid() {
                return Ok(());
            }
            let mut node = self.store.read_internal(current)?;
            let idx = child_position(&node, current, child)?;
            if idx > 0 {
                if codec.compare(&node.keys[idx - 1], old) == Ordering::Equal {
                    node.keys[idx - 1] = new.clone();
                    self.store.write_internal(current, &node)?;
                    debug!(node = %current, %old, %new, "replaced stale separator");
                }
                return Ok(());
            }
            child = current;
            current = node.parent;
        }
        Err(Error::corrupt(current.as_u64(), "ancestor walk did not reach the root"))
    }

    // ========================================================================
    // Internal nodes
    // ========================================================================

    /// Restore the invariants of an internal node that just lost a key.
    ///
    /// `node` must already be written at `offset`.
    fn rebalance_internal(&mut self, offset: NodeOffset, node: InternalNode) -> Result<()> {
        if !node.parent.is_valid() {
            if node.n_keys() == 0 {
                return self.collapse_root(offset, &node);
            }
            return Ok(());
        }
        if node.n_keys() >= self.min_keys() {
            return Ok(());
        }
        self.handle_internal_underflow(offset, node)
    }

    fn collapse_root(&mut self, offset: NodeOffset, root: &InternalNode) -> Result<()> {
        let child = root.children[0];
        self.set_parent(child, NodeOffset::NONE)?;
        self.store.set_root(child)?;

        TreeStats::bump(&self.store.stats().root_collapses);
        debug!(old = %offset, new = %child, "collapsed root");
        Ok(())
    }

    fn handle_internal_underflow(&mut self, offset: NodeOffset, mut node: InternalNode) -> Result<()> {
        let parent_offset = node.parent;
        let mut parent = self.store.read_internal(parent_offset)?;
        let idx = child_position(&parent, parent_offset, offset)?;
        let min = self.min_keys();

        if idx > 0 {
            let left_offset = parent.children[idx - 1];
            let mut left = self.store.read_internal(left_offset)?;
            if left.n_keys() > min {
                let lifted = pop_last(&mut left.keys, left_offset)?;
                let moved = pop_last(&mut left.children, left_offset)?;
                let separator = std::mem::replace(&mut parent.keys[idx - 1], lifted);
                node.keys.insert(0, separator);
                node.children.insert(0, moved);

                self.store.write_internal(left_offset, &left)?;
                self.store.write_internal(offset, &node)?;
                self.store.write_internal(parent_offset, &parent)?;
                self.set_parent(moved, offset)?;
                TreeStats::bump(&self.store.stats().redistributions);
                debug!(from = %left_offset, to = %offset, "rotated from left internal node");
                return Ok(());
            }
        }

        if idx + 1 < parent.children.len() {
            let right_offset = parent.children[idx + 1];
            let mut right = self.store.read_internal(right_offset)?;
            if right.n_keys() > min {
                let lifted = right.keys.remove(0);
                let moved = right.children.remove(0);
                let separator = std::mem::replace(&mut parent.keys[idx], lifted);
                node.keys.push(separator);
                node.children.push(moved);

                self.store.write_internal(right_offset, &right)?;
                self.store.write_internal(offset, &node)?;
                self.store.write_internal(parent_offset, &parent)?;
                self.set_parent(moved, offset)?;
                TreeStats::bump(&self.store.stats().redistributions);
                debug!(from = %right_offset, to = %offset, "rotated from right internal node");
                return Ok(());
            }
        }

        let left_idx = merge_position(idx, parent.children.len(), parent_offset)?;
        self.merge_internal(&mut parent, left_idx)?;
        self.store.write_internal(parent_offset, &parent)?;
        self.rebalance_internal(parent_offset, parent)
    }

    /// Merge `children[left_idx + 1]` into `children[left_idx]`, pulling
    /// their separator down between them.
    fn merge_internal(&mut self, parent: &mut InternalNode, left_idx: usize) -> Result<()> {
        let left_offset = parent.children[left_idx];
        let right_offset = parent.children[left_idx + 1];
        let mut left = self.store.read_internal(left_offset)?;
        let right = self.store.read_internal(right_offset)?;

        let separator = parent.keys.remove(left_idx);
        parent.children.remove(left_idx + 1);

        for &child in &right.children {
            self.set_parent(child, left_offset)?;
        }
        left.keys.push(separator);
        left.keys.extend(right.keys);
        left.children.extend(right.children);
        self.store.write_internal(left_offset, &left)?;

        TreeStats::bump(&self.store.stats().internal_merges);
        debug!(into = %left_offset, from = %right_offset, "merged internal nodes");
        Ok(())
    }
}

fn child_position(parent: &InternalNode, parent_offset: NodeOffset, child: NodeOffset) -> Result<usize> {
    parent
        .index_of_child(child)
        .ok_or_else(|| Error::corrupt(parent_offset.as_u64(), format!("{} is not a child", child)))
}

/// Index of the left node of the pair to merge: the node itself when it has
/// a right sibling, otherwise its left sibling.
fn merge_position(idx: usize, n_children: usize, parent_offset: NodeOffset) -> Result<usize> {
    if idx + 1 < n_children {
        Ok(idx)
    } else if idx > 0 {
        Ok(idx - 1)
    } else {
        Err(Error::invariant(format!(
            "{} has a single child and nothing to merge",
            parent_offset
        )))
    }
}

fn pop_last<T>(items: &mut Vec<T>, offset: NodeOffset) -> Result<T> {
    items
        .pop()
        .ok_or_else(|| Error::invariant(format!("lending node {} is empty", offset)))
}

fn first_key(leaf: &LeafNode, offset: NodeOffset) -> Result<Key> {
    leaf.first_key()
        .cloned()
        .ok_or_else(|| Error::invariant(format!("leaf {} is empty after borrowing", offset)))
}
