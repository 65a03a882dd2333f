//! Disk-resident B+ tree index.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  TreeIndex                   │
//! │  search / insert / delete / range / verify   │
//! └──────────────────────┬───────────────────────┘
//!                        │ NodeOffset
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                  NodeStore                   │
//! │   read_node / write_node / append_node       │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!                   node file
//! ```
//!
//! Nodes never live in memory between operations: every step reads the
//! node it needs from the store and writes it back before moving on, and
//! every link (child, parent, next leaf) is a byte offset.
//!
//! The operations are split across files:
//! - `search` - point lookups, duplicate scans, range scans
//! - `insert` - leaf and internal splits, root growth
//! - `delete` - redistribution, merges, root collapse
//! - `verify` - full structural check

mod delete;
mod insert;
mod search;
mod verify;

use std::path::Path;

use tracing::trace;

use crate::common::config::TreeConfig;
use crate::common::{Error, NodeOffset, Result, TreeStats};
use crate::index::{Key, KeyCodec};
use crate::storage::node::{LeafNode, Node};
use crate::storage::NodeStore;

/// Which child a key equal to a separator descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ties {
    /// Leftmost child that may hold the key; used by lookups and scans.
    Left,
    /// Child the key would be inserted into.
    Right,
}

/// A B+ tree mapping keys to record positions, stored in one node file.
///
/// With `allow_duplicates == false` the tree is a unique (clustered) index
/// and inserting an existing key fails with [`Error::DuplicateKey`].
/// Otherwise equal keys are kept in insertion order and
/// [`search_all`](Self::search_all) returns all of them.
///
/// # Example
/// ```no_run
/// use bptree_index::{Key, KeyType, TreeConfig, TreeIndex};
///
/// let config = TreeConfig::new(KeyType::Int).with_order(4);
/// let mut tree = TreeIndex::create("index.db", config)?;
/// tree.insert(Key::Int(10), 4)?;
/// assert_eq!(tree.search(&Key::Int(10))?, Some(4));
/// # Ok::<(), bptree_index::Error>(())
/// ```
pub struct TreeIndex {
    store: NodeStore,
    allow_duplicates: bool,
}

impl TreeIndex {
    /// Create a new, empty tree at `path`.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let store = NodeStore::create(path, &config)?;
        Ok(Self::with_store(store, config.allow_duplicates))
    }

    /// Open an existing tree. The order is read from the file.
    pub fn open<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let store = NodeStore::open(path, config.key_type)?;
        Ok(Self::with_store(store, config.allow_duplicates))
    }

    /// Open the tree at `path`, creating it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let store = NodeStore::open_or_create(path, &config)?;
        Ok(Self::with_store(store, config.allow_duplicates))
    }

    /// Wrap an already opened node store.
    pub fn with_store(store: NodeStore, allow_duplicates: bool) -> Self {
        Self {
            store,
            allow_duplicates,
        }
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.store.order()
    }

    #[inline]
    pub fn allows_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    #[inline]
    pub fn root(&self) -> NodeOffset {
        self.store.root()
    }

    #[inline]
    pub fn stats(&self) -> &TreeStats {
        self.store.stats()
    }

    #[inline]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Flush the node file to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.store.sync()
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    #[inline]
    fn max_keys(&self) -> usize {
        self.store.order() - 1
    }

    #[inline]
    fn min_keys(&self) -> usize {
        self.store.order().div_ceil(2) - 1
    }

    #[inline]
    fn codec(&self) -> KeyCodec {
        *self.store.codec()
    }

    /// Upper bound on root-to-leaf steps; exceeding it means a cycle.
    fn depth_limit(&self) -> usize {
        self.store.header().node_count() as usize + 1
    }

    /// Upper bound on leaf-chain steps.
    fn chain_limit(&self) -> usize {
        self.store.header().n_leaf as usize + 1
    }

    /// Descend from the root to the leaf responsible for `key`.
    ///
    /// Returns `None` for an empty tree.
    fn descend(&mut self, key: &Key, ties: Ties) -> Result<Option<(NodeOffset, LeafNode)>> {
        let codec = self.codec();
        let mut offset = self.store.root();
        if !offset.is_valid() {
            return Ok(None);
        }

        for _ in 0..self.depth_limit() {
            match self.store.read_node(offset)? {
                Node::Leaf(leaf) => return Ok(Some((offset, leaf))),
                Node::Internal(node) => {
                    let idx = match ties {
                        Ties::Left => node.lower_child_index(&codec, key),
                        Ties::Right => node.child_index(&codec, key),
                    };
                    trace!(%offset, idx, "descend");
                    offset = node.children[idx];
                }
            }
        }
        Err(Error::corrupt(
            offset.as_u64(),
            "descent did not reach a leaf",
        ))
    }

    /// Offset of the leftmost leaf, or `None` for an empty tree.
    fn first_leaf(&mut self) -> Result<Option<NodeOffset>> {
        let mut offset = self.store.root();
        if !offset.is_valid() {
            return Ok(None);
        }

        for _ in 0..self.depth_limit() {
            match self.store.read_node(offset)? {
                Node::Leaf(_) => return Ok(Some(offset)),
                Node::Internal(node) => offset = node.children[0],
            }
        }
        Err(Error::corrupt(
            offset.as_u64(),
            "descent did not reach a leaf",
        ))
    }

    /// Rewrite the parent link of the node at `child`.
    fn set_parent(&mut self, child: NodeOffset, parent: NodeOffset) -> Result<()> {
        let mut node = self.store.read_node(child)?;
        node.set_parent(parent);
        self.store.write_node(child, &node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KeyType;
    use tempfile::tempdir;

    fn tree(order: usize) -> (TreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(KeyType::Int).with_order(order);
        let tree = TreeIndex::create(dir.path().join("index.db"), config).unwrap();
        (tree, dir)
    }

    #[test]
    fn test_empty_tree() {
        let (mut tree, _dir) = tree(4);
        assert!(!tree.root().is_valid());
        assert!(tree.descend(&Key::Int(1), Ties::Left).unwrap().is_none());
        assert!(tree.first_leaf().unwrap().is_none());
    }

    #[test]
    fn test_occupancy_bounds() {
        for (order, min, max) in [(3, 1, 2), (4, 1, 3), (5, 2, 4), (6, 2, 5), (7, 3, 6)] {
            let (tree, _dir) = tree(order);
            assert_eq!(tree.min_keys(), min, "order {}", order);
            assert_eq!(tree.max_keys(), max, "order {}", order);
        }
    }

    #[test]
    fn test_descend_ties() {
        let (mut tree, _dir) = tree(4);
        for k in [10, 20, 30, 40] {
            tree.insert(Key::Int(k), k as u64).unwrap();
        }
        // Leaves [10, 20] and [30, 40] under separator 30.
        let (_, right) = tree.descend(&Key::Int(30), Ties::Right).unwrap().unwrap();
        assert_eq!(right.first_key(), Some(&Key::Int(30)));

        let (_, left) = tree.descend(&Key::Int(30), Ties::Left).unwrap().unwrap();
        assert_eq!(left.first_key(), Some(&Key::Int(10)));
    }
}
