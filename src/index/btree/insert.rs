//! Insertion with leaf and internal splits.

use tracing::debug;

use super::{Ties, TreeIndex};
use crate::common::{Error, NodeOffset, RecordPosition, Result, TreeStats};
use crate::index::Key;
use crate::storage::node::{InternalNode, LeafEntry, LeafNode};

impl TreeIndex {
    /// Insert `key -> position`.
    ///
    /// # Errors
    /// Returns `Error::DuplicateKey` if the tree is unique and `key` is
    /// already present, or `Error::Format` if `key` has the wrong type. The
    /// tree is unchanged in both cases.
    pub fn insert(&mut self, key: Key, position: RecordPosition) -> Result<()> {
        let codec = self.codec();
        let key = codec.normalize(&key)?;

        if !self.allow_duplicates && self.locate(&key)?.is_some() {
            return Err(Error::DuplicateKey(key.to_string()));
        }

        let entry = LeafEntry::new(key, position);
        let Some((offset, mut leaf)) = self.descend(&entry.key, Ties::Right)? else {
            let root = LeafNode::new(NodeOffset::NONE, NodeOffset::NONE, vec![entry]);
            let offset = self.store.append_node(&root.into())?;
            debug!(%offset, "created root leaf");
            return Ok(());
        };

        leaf.insert(&codec, entry);
        if leaf.n_keys() <= self.max_keys() {
            return self.store.write_leaf(offset, &leaf);
        }
        self.split_leaf(offset, leaf)
    }

    /// Split an overflowing leaf; the upper half moves to a new right sibling.
    fn split_leaf(&mut self, offset: NodeOffset, mut leaf: LeafNode) -> Result<()> {
        let mid = leaf.n_keys() / 2;
        let upper = leaf.entries.split_off(mid);
        let promoted = upper[0].key.clone();

        let right = LeafNode::new(leaf.parent, leaf.next_leaf, upper);
        let right_offset = self.store.append_node(&right.into())?;

        leaf.next_leaf = right_offset;
        self.store.write_leaf(offset, &leaf)?;

        TreeStats::bump(&self.store.stats().leaf_splits);
        debug!(left = %offset, right = %right_offset, %promoted, "split leaf");

        self.insert_in_parent(offset, leaf.parent, promoted, right_offset)
    }

    /// Add separator `key` with `right` as the sibling after `left`.
    fn insert_in_parent(
        &mut self,
        left: NodeOffset,
        parent: NodeOffset,
        key: Key,
        right: NodeOffset,
    ) -> Result<()> {
        if !parent.is_valid() {
            return self.grow_root(left, key, right);
        }

        let mut node = self.store.read_internal(parent)?;
        let idx = node
            .index_of_child(left)
            .ok_or_else(|| Error::corrupt(parent.as_u64(), format!("{} is not a child", left)))?;
        node.insert_after(idx, key, right);

        if node.n_keys() <= self.max_keys() {
            return self.store.write_internal(parent, &node);
        }
        self.split_internal(parent, node)
    }

    /// Split an overflowing internal node around its middle key.
    ///
    /// The middle key moves up and appears in neither half.
    fn split_internal(&mut self, offset: NodeOffset, mut node: InternalNode) -> Result<()> {
        let mid = (node.n_keys() - 1) / 2;
        let right_keys = node.keys.split_off(mid + 1);
        let promoted = node
            .keys
            .pop()
            .ok_or_else(|| Error::invariant("split of an internal node without keys"))?;
        let right_children = node.children.split_off(mid + 1);

        let right = InternalNode::new(node.parent, right_keys, right_children.clone());
        let right_offset = self.store.append_node(&right.into())?;
        for child in right_children {
            self.set_parent(child, right_offset)?;
        }
        self.store.write_internal(offset, &node)?;

        TreeStats::bump(&self.store.stats().internal_splits);
        debug!(left = %offset, right = %right_offset, %promoted, "split internal node");

        self.insert_in_parent(offset, node.parent, promoted, right_offset)
    }

    /// Put a new root above the two halves of a split root.
    fn grow_root(&mut self, left: NodeOffset, key: Key, right: NodeOffset) -> Result<()> {
        let root = InternalNode::new(NodeOffset::NONE, vec![key], vec![left, right]);
        let root_offset = self.store.append_node(&root.into())?;

        self.set_parent(left, root_offset)?;
        self.set_parent(right, root_offset)?;
        self.store.set_root(root_offset)?;

        debug!(root = %root_offset, "grew new root");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::config::TreeConfig;
    use crate::common::{Error, NodeOffset};
    use crate::index::{Key, KeyType, TreeIndex};
    use crate::storage::node::Node;
    use tempfile::tempdir;

    fn tree(order: usize) -> (TreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(KeyType::Int).with_order(order);
        (TreeIndex::create(dir.path().join("index.db"), config).unwrap(), dir)
    }

    fn leaf_keys(tree: &mut TreeIndex) -> Vec<Vec<i32>> {
        let mut leaves = Vec::new();
        let mut offset = tree.first_leaf().unwrap().unwrap_or(NodeOffset::NONE);
        while offset.is_valid() {
            let leaf = tree.store.read_leaf(offset).unwrap();
            leaves.push(
                leaf.entries
                    .iter()
                    .map(|e| match e.key {
                        Key::Int(k) => k,
                        _ => unreachable!(),
                    })
                    .collect(),
            );
            offset = leaf.next_leaf;
        }
        leaves
    }

    #[test]
    fn test_first_insert_creates_root_leaf() {
        let (mut tree, _dir) = tree(4);
        tree.insert(Key::Int(7), 70).unwrap();

        assert_eq!(tree.root().0, 20);
        assert_eq!(tree.height().unwrap(), 1);
        assert_eq!(tree.search(&Key::Int(7)).unwrap(), Some(70));
    }

    #[test]
    fn test_leaf_split_at_order() {
        let (mut tree, _dir) = tree(4);
        for k in [10, 20, 30] {
            tree.insert(Key::Int(k), 0).unwrap();
        }
        assert_eq!(tree.height().unwrap(), 1);

        tree.insert(Key::Int(40), 0).unwrap();
        assert_eq!(tree.height().unwrap(), 2);
        assert_eq!(leaf_keys(&mut tree), vec![vec![10, 20], vec![30, 40]]);

        let root = tree.store.read_internal(tree.root()).unwrap();
        assert_eq!(root.keys, vec![Key::Int(30)]);
        assert_eq!(tree.stats().snapshot().leaf_splits, 1);
    }

    #[test]
    fn test_sequential_inserts_order_4() {
        let (mut tree, _dir) = tree(4);
        for k in [10, 20, 30, 40, 50, 60, 70] {
            tree.insert(Key::Int(k), k as u64).unwrap();
        }

        assert_eq!(tree.height().unwrap(), 2);
        assert_eq!(
            leaf_keys(&mut tree),
            vec![vec![10, 20], vec![30, 40], vec![50, 60, 70]]
        );
        let root = tree.store.read_internal(tree.root()).unwrap();
        assert_eq!(root.keys, vec![Key::Int(30), Key::Int(50)]);
        tree.verify().unwrap();
    }

    #[test]
    fn test_internal_split_reparents_children() {
        let (mut tree, _dir) = tree(3);
        for k in 1..=10 {
            tree.insert(Key::Int(k), k as u64).unwrap();
        }

        assert!(tree.height().unwrap() >= 3);
        assert!(tree.stats().snapshot().internal_splits > 0);

        let root = tree.store.read_internal(tree.root()).unwrap();
        assert!(!root.parent.is_valid());
        for &child in &root.children {
            match tree.store.read_node(child).unwrap() {
                Node::Internal(node) => assert_eq!(node.parent, tree.root()),
                Node::Leaf(_) => panic!("height 3 root has leaf children"),
            }
        }
        tree.verify().unwrap();
    }

    #[test]
    fn test_duplicate_rejected() {
        let (mut tree, _dir) = tree(4);
        tree.insert(Key::Int(5), 1).unwrap();
        let size = tree.store().file_size();

        let err = tree.insert(Key::Int(5), 2).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert_eq!(tree.store().file_size(), size);
        assert_eq!(tree.search(&Key::Int(5)).unwrap(), Some(1));
    }

    #[test]
    fn test_duplicates_allowed() {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(KeyType::Int).with_duplicates(true);
        let mut tree = TreeIndex::create(dir.path().join("index.db"), config).unwrap();

        tree.insert(Key::Int(5), 1).unwrap();
        tree.insert(Key::Int(5), 2).unwrap();
        assert_eq!(tree.search_all(&Key::Int(5)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_wrong_key_type_rejected() {
        let (mut tree, _dir) = tree(4);
        assert!(matches!(tree.insert(Key::Float(1.0), 0), Err(Error::Format(_))));
        assert!(!tree.root().is_valid());
    }

    #[test]
    fn test_reverse_inserts() {
        let (mut tree, _dir) = tree(5);
        for k in (1..=50).rev() {
            tree.insert(Key::Int(k), k as u64).unwrap();
        }
        let keys: Vec<i32> = leaf_keys(&mut tree).concat();
        assert_eq!(keys, (1..=50).collect::<Vec<_>>());
        tree.verify().unwrap();
    }
}
