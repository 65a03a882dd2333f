//! Node types and their fixed-size binary layout.
//!
//! This module contains:
//! - [`LeafNode`] - `(key, record position)` entries plus the leaf chain link
//! - [`InternalNode`] - separator keys and child offsets
//! - [`NodeLayout`] - node sizes and encode/decode for a given order and key width

mod internal;
mod layout;
mod leaf;

pub use internal::InternalNode;
pub use layout::{NodeKind, NodeLayout};
pub(crate) use layout::{read_i32, read_i64};
pub use leaf::{LeafEntry, LeafNode};

use crate::common::NodeOffset;

/// A decoded node of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Internal(_) => NodeKind::Internal,
        }
    }

    pub fn parent(&self) -> NodeOffset {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Internal(node) => node.parent,
        }
    }

    pub fn set_parent(&mut self, parent: NodeOffset) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Internal(node) => node.parent = parent,
        }
    }

    pub fn n_keys(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.n_keys(),
            Node::Internal(node) => node.n_keys(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

impl From<LeafNode> for Node {
    fn from(leaf: LeafNode) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<InternalNode> for Node {
    fn from(node: InternalNode) -> Self {
        Node::Internal(node)
    }
}
