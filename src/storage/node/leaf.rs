//! Leaf nodes.

use std::cmp::Ordering;

use crate::common::{NodeOffset, RecordPosition};
use crate::index::{Key, KeyCodec};

/// One `(key, record position)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafEntry {
    pub key: Key,
    pub position: RecordPosition,
}

impl LeafEntry {
    pub fn new(key: Key, position: RecordPosition) -> Self {
        Self { key, position }
    }
}

/// A leaf: sorted entries plus the link to the next leaf in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub parent: NodeOffset,
    pub next_leaf: NodeOffset,
    pub entries: Vec<LeafEntry>,
}

impl LeafNode {
    pub fn new(parent: NodeOffset, next_leaf: NodeOffset, entries: Vec<LeafEntry>) -> Self {
        Self {
            parent,
            next_leaf,
            entries,
        }
    }

    #[inline]
    pub fn n_keys(&self) -> usize {
        self.entries.len()
    }

    pub fn first_key(&self) -> Option<&Key> {
        self.entries.first().map(|e| &e.key)
    }

    /// Index of the first entry whose key equals `key`.
    pub fn find(&self, codec: &KeyCodec, key: &Key) -> Option<usize> {
        let idx = self.lower_bound(codec, key);
        match self.entries.get(idx) {
            Some(entry) if codec.compare(&entry.key, key) == Ordering::Equal => Some(idx),
            _ => None,
        }
    }

    /// Index of the first entry with a key `>= key`.
    pub fn lower_bound(&self, codec: &KeyCodec, key: &Key) -> usize {
        self.entries
            .iter()
            .take_while(|e| codec.compare(&e.key, key) == Ordering::Less)
            .count()
    }

    /// Insert keeping key order; equal keys keep insertion order.
    ///
    /// Returns the index the entry landed at.
    pub fn insert(&mut self, codec: &KeyCodec, entry: LeafEntry) -> usize {
        let idx = self
            .entries
            .iter()
            .take_while(|e| codec.compare(&e.key, &entry.key) != Ordering::Greater)
            .count();
        self.entries.insert(idx, entry);
        idx
    }
}
