//! Structural self-check.

use std::cmp::Ordering;

use super::TreeIndex;
use crate::common::{Error, NodeOffset, Result};
use crate::index::{Key, KeyCodec};
use crate::storage::node::Node;

/// Leaves seen so far, in depth-first order.
#[derive(Default)]
struct Walk {
    /// `(offset, next_leaf)` of each leaf.
    leaves: Vec<(NodeOffset, NodeOffset)>,
    leaf_depth: Option<usize>,
}

/// Key range a subtree must stay inside: `lo <= key < hi`, or
/// `lo <= key <= hi` when duplicates are allowed.
#[derive(Clone, Copy)]
struct Bounds<'a> {
    lo: Option<&'a Key>,
    hi: Option<&'a Key>,
}

impl TreeIndex {
    /// Walk the whole tree and check its structure:
    ///
    /// - every node holds at most `order - 1` keys and every non-root node
    ///   at least `ceil(order / 2) - 1`
    /// - keys are sorted and lie between the separators above them
    /// - every child points back at its parent and only the root has none
    /// - all leaves sit at the same depth
    /// - the leaf chain visits the leaves in key order and ends in `NONE`
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first breakage.
    pub fn verify(&mut self) -> Result<()> {
        let root = self.store.root();
        if !root.is_valid() {
            return Ok(());
        }

        let mut walk = Walk::default();
        let bounds = Bounds { lo: None, hi: None };
        self.verify_node(root, NodeOffset::NONE, bounds, 1, &mut walk)?;

        for pair in walk.leaves.windows(2) {
            let ((offset, next), (following, _)) = (pair[0], pair[1]);
            if next != following {
                return Err(Error::invariant(format!(
                    "leaf {} links to {} but the next leaf is {}",
                    offset, next, following
                )));
            }
        }
        if let Some(&(offset, next)) = walk.leaves.last() {
            if next.is_valid() {
                return Err(Error::invariant(format!(
                    "last leaf {} links to {}",
                    offset, next
                )));
            }
        }
        Ok(())
    }

    fn verify_node(
        &mut self,
        offset: NodeOffset,
        parent: NodeOffset,
        bounds: Bounds<'_>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if depth > self.depth_limit() {
            return Err(Error::invariant(format!("{} is deeper than the node count", offset)));
        }

        let node = self.store.read_node(offset)?;
        if node.parent() != parent {
            return Err(Error::invariant(format!(
                "{} has parent {}, expected {}",
                offset,
                node.parent(),
                parent
            )));
        }

        let is_root = !parent.is_valid();
        let n_keys = node.n_keys();
        if n_keys > self.max_keys() {
            return Err(Error::invariant(format!("{} holds {} keys", offset, n_keys)));
        }
        if !is_root && n_keys < self.min_keys() {
            return Err(Error::invariant(format!(
                "{} holds {} keys, minimum is {}",
                offset,
                n_keys,
                self.min_keys()
            )));
        }

        let codec = self.codec();
        match node {
            Node::Leaf(leaf) => {
                let keys: Vec<&Key> = leaf.entries.iter().map(|e| &e.key).collect();
                self.check_keys(&codec, offset, &keys, bounds, !self.allow_duplicates)?;

                if let Some(expected) = walk.leaf_depth {
                    if expected != depth {
                        return Err(Error::invariant(format!(
                            "leaf {} at depth {}, other leaves at {}",
                            offset, depth, expected
                        )));
                    }
                }
                walk.leaf_depth = Some(depth);
                walk.leaves.push((offset, leaf.next_leaf));
                Ok(())
            }
            Node::Internal(node) => {
                if is_root && n_keys == 0 {
                    return Err(Error::invariant(format!("internal root {} has no keys", offset)));
                }
                let keys: Vec<&Key> = node.keys.iter().collect();
                self.check_keys(&codec, offset, &keys, bounds, false)?;

                for (i, &child) in node.children.iter().enumerate() {
                    let child_bounds = Bounds {
                        lo: if i == 0 { bounds.lo } else { Some(&node.keys[i - 1]) },
                        hi: if i == n_keys { bounds.hi } else { Some(&node.keys[i]) },
                    };
                    self.verify_node(child, offset, child_bounds, depth + 1, walk)?;
                }
                Ok(())
            }
        }
    }

    fn check_keys(
        &self,
        codec: &KeyCodec,
        offset: NodeOffset,
        keys: &[&Key],
        bounds: Bounds<'_>,
        strict: bool,
    ) -> Result<()> {
        for pair in keys.windows(2) {
            let order = codec.compare(pair[0], pair[1]);
            if order == Ordering::Greater || (strict && order == Ordering::Equal) {
                return Err(Error::invariant(format!(
                    "{} keys out of order: {} before {}",
                    offset, pair[0], pair[1]
                )));
            }
        }

        for &key in keys {
            if let Some(lo) = bounds.lo {
                if codec.compare(key, lo) == Ordering::Less {
                    return Err(Error::invariant(format!(
                        "{} key {} below separator {}",
                        offset, key, lo
                    )));
                }
            }
            if let Some(hi) = bounds.hi {
                let above = match codec.compare(key, hi) {
                    Ordering::Greater => true,
                    Ordering::Equal => !self.allow_duplicates,
                    Ordering::Less => false,
                };
                if above {
                    return Err(Error::invariant(format!(
                        "{} key {} not below separator {}",
                        offset, key, hi
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::config::TreeConfig;
    use crate::common::{Error, NodeOffset};
    use crate::index::{Key, KeyType, TreeIndex};
    use tempfile::tempdir;

    fn tree(keys: &[i32]) -> (TreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(KeyType::Int).with_order(4);
        let mut tree = TreeIndex::create(dir.path().join("index.db"), config).unwrap();
        for &k in keys {
            tree.insert(Key::Int(k), k as u64).unwrap();
        }
        (tree, dir)
    }

    #[test]
    fn test_verify_empty_and_healthy() {
        let (mut tree, _dir) = tree(&[]);
        tree.verify().unwrap();

        let (mut tree, _dir) = self::tree(&(0..100).collect::<Vec<_>>());
        tree.verify().unwrap();
    }

    #[test]
    fn test_verify_detects_broken_chain() {
        let (mut tree, _dir) = tree(&[10, 20, 30, 40, 50, 60]);
        let first = tree.first_leaf().unwrap().unwrap();
        let mut leaf = tree.store.read_leaf(first).unwrap();
        leaf.next_leaf = NodeOffset::NONE;
        tree.store.write_leaf(first, &leaf).unwrap();

        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_detects_bad_parent() {
        let (mut tree, _dir) = tree(&[10, 20, 30, 40]);
        let first = tree.first_leaf().unwrap().unwrap();
        tree.set_parent(first, NodeOffset::new(999)).unwrap();

        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_detects_misplaced_key() {
        let (mut tree, _dir) = tree(&[10, 20, 30, 40]);
        let first = tree.first_leaf().unwrap().unwrap();
        let mut leaf = tree.store.read_leaf(first).unwrap();
        leaf.entries[1].key = Key::Int(35);
        tree.store.write_leaf(first, &leaf).unwrap();

        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }
}
