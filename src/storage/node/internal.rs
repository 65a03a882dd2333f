//! Internal (routing) nodes.

use std::cmp::Ordering;

use crate::common::NodeOffset;
use crate::index::{Key, KeyCodec};

/// An internal node with `n_keys` separators and `n_keys + 1` children.
///
/// `children[i]` holds keys below `keys[i]`; `children[i + 1]` holds keys
/// at or above it.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    pub parent: NodeOffset,
    pub keys: Vec<Key>,
    pub children: Vec<NodeOffset>,
}

impl InternalNode {
    pub fn new(parent: NodeOffset, keys: Vec<Key>, children: Vec<NodeOffset>) -> Self {
        Self {
            parent,
            keys,
            children,
        }
    }

    #[inline]
    pub fn n_keys(&self) -> usize {
        self.keys.len()
    }

    /// Child to follow for `key`; a key equal to a separator goes right.
    pub fn child_index(&self, codec: &KeyCodec, key: &Key) -> usize {
        self.keys
            .iter()
            .take_while(|sep| codec.compare(key, sep) != Ordering::Less)
            .count()
    }

    /// Leftmost child that may hold `key`; a key equal to a separator goes left.
    pub fn lower_child_index(&self, codec: &KeyCodec, key: &Key) -> usize {
        self.keys
            .iter()
            .take_while(|sep| codec.compare(key, sep) == Ordering::Greater)
            .count()
    }

    pub fn index_of_child(&self, child: NodeOffset) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Insert `key` with `right` as the child immediately after `children[idx]`.
    pub fn insert_after(&mut self, idx: usize, key: Key, right: NodeOffset) {
        self.keys.insert(idx, key);
        self.children.insert(idx + 1, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::KeyType;

    fn node() -> InternalNode {
        InternalNode::new(
            NodeOffset::NONE,
            vec![Key::Int(30), Key::Int(50)],
            vec![NodeOffset::new(20), NodeOffset::new(100), NodeOffset::new(200)],
        )
    }

    #[test]
    fn test_child_index_ties_right() {
        let codec = KeyCodec::new(KeyType::Int).unwrap();
        let n = node();
        assert_eq!(n.child_index(&codec, &Key::Int(10)), 0);
        assert_eq!(n.child_index(&codec, &Key::Int(30)), 1);
        assert_eq!(n.child_index(&codec, &Key::Int(49)), 1);
        assert_eq!(n.child_index(&codec, &Key::Int(50)), 2);
        assert_eq!(n.child_index(&codec, &Key::Int(99)), 2);
    }

    #[test]
    fn test_lower_child_index_ties_left() {
        let codec = KeyCodec::new(KeyType::Int).unwrap();
        let n = node();
        assert_eq!(n.lower_child_index(&codec, &Key::Int(30)), 0);
        assert_eq!(n.lower_child_index(&codec, &Key::Int(31)), 1);
        assert_eq!(n.lower_child_index(&codec, &Key::Int(50)), 1);
        assert_eq!(n.lower_child_index(&codec, &Key::Int(51)), 2);
    }

    #[test]
    fn test_insert_after() {
        let mut n = node();
        n.insert_after(1, Key::Int(40), NodeOffset::new(300));
        assert_eq!(n.keys, vec![Key::Int(30), Key::Int(40), Key::Int(50)]);
        assert_eq!(
            n.children,
            vec![
                NodeOffset::new(20),
                NodeOffset::new(100),
                NodeOffset::new(300),
                NodeOffset::new(200)
            ]
        );
        assert_eq!(n.index_of_child(NodeOffset::new(300)), Some(2));
        assert_eq!(n.index_of_child(NodeOffset::new(7)), None);
    }
}
