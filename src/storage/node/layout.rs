//! Fixed-size binary layout of leaf and internal nodes.
//!
//! # Leaf layout
//! ```text
//! Offset  Size            Field
//! ------  ----            -----
//! 0       1               kind (1 = leaf)
//! 1       8               parent (i64, -1 if root)
//! 9       4               n_keys (i32)
//! 13      8               next_leaf (i64, -1 if last)
//! 21      (order-1)*(w+8) slots: key[w], position (u64)
//! ```
//!
//! # Internal layout
//! ```text
//! Offset  Size            Field
//! ------  ----            -----
//! 0       1               kind (0 = internal)
//! 1       8               parent (i64, -1 if root)
//! 9       4               n_keys (i32)
//! 13      8               children[0] (i64)
//! 21      (order-1)*(w+8) slots: key[w], children[i+1] (i64)
//! ```
//!
//! All integers are little-endian. Slots past `n_keys` are zero-filled on
//! write and ignored on read.

use crate::common::{Error, NodeOffset, Result};
use crate::index::KeyCodec;

use super::{InternalNode, LeafEntry, LeafNode, Node};

/// On-disk discriminator byte.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal = 0,
    Leaf = 1,
}

impl NodeKind {
    /// Convert from u8, returning None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NodeKind::Internal),
            1 => Some(NodeKind::Leaf),
            _ => None,
        }
    }
}

/// Sizes and codec for nodes of one order and key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    order: usize,
    codec: KeyCodec,
}

impl NodeLayout {
    pub const OFFSET_KIND: usize = 0;
    pub const OFFSET_PARENT: usize = 1;
    pub const OFFSET_N_KEYS: usize = 9;
    /// `next_leaf` in a leaf, `children[0]` in an internal node.
    pub const OFFSET_LINK: usize = 13;
    pub const OFFSET_SLOTS: usize = 21;

    pub const LEAF_HEADER_SIZE: usize = 21;
    pub const INTERNAL_HEADER_SIZE: usize = 13;

    const POINTER_SIZE: usize = 8;

    pub fn new(order: usize, codec: KeyCodec) -> Self {
        Self { order, codec }
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    #[inline]
    fn slot_size(&self) -> usize {
        self.codec.width() + Self::POINTER_SIZE
    }

    /// Bytes occupied by one node of the given kind.
    pub fn node_size(&self, kind: NodeKind) -> usize {
        let key_width = self.codec.width();
        match kind {
            NodeKind::Leaf => Self::LEAF_HEADER_SIZE + (self.order - 1) * self.slot_size(),
            NodeKind::Internal => {
                Self::INTERNAL_HEADER_SIZE
                    + self.order * Self::POINTER_SIZE
                    + (self.order - 1) * key_width
            }
        }
    }

    /// Encode a node into exactly [`node_size`](Self::node_size) bytes.
    ///
    /// # Errors
    /// - `Error::InvariantViolation` if the node holds more than `order - 1`
    ///   keys, an internal node's child count is not `n_keys + 1`, or the
    ///   encoded length differs from the fixed size
    /// - `Error::Format` if a key does not match the key type
    pub fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        match node {
            Node::Leaf(leaf) => self.encode_leaf(leaf),
            Node::Internal(internal) => self.encode_internal(internal),
        }
    }

    pub fn encode_leaf(&self, leaf: &LeafNode) -> Result<Vec<u8>> {
        let mut buf = self.begin(NodeKind::Leaf, leaf.parent, leaf.n_keys())?;
        buf.extend_from_slice(&leaf.next_leaf.0.to_le_bytes());
        let mut key_buf = vec![0u8; self.codec.width()];
        for entry in &leaf.entries {
            self.codec.serialize_into(&entry.key, &mut key_buf)?;
            buf.extend_from_slice(&key_buf);
            buf.extend_from_slice(&entry.position.to_le_bytes());
        }
        self.finish(NodeKind::Leaf, buf)
    }

    pub fn encode_internal(&self, node: &InternalNode) -> Result<Vec<u8>> {
        let n_keys = node.n_keys();
        if node.children.len() != n_keys + 1 {
            return Err(Error::invariant(format!(
                "internal node has {} keys but {} children",
                n_keys,
                node.children.len()
            )));
        }
        let mut buf = self.begin(NodeKind::Internal, node.parent, n_keys)?;
        buf.extend_from_slice(&node.children[0].0.to_le_bytes());
        let mut key_buf = vec![0u8; self.codec.width()];
        for (key, child) in node.keys.iter().zip(&node.children[1..]) {
            self.codec.serialize_into(key, &mut key_buf)?;
            buf.extend_from_slice(&key_buf);
            buf.extend_from_slice(&child.0.to_le_bytes());
        }
        self.finish(NodeKind::Internal, buf)
    }

    fn begin(&self, kind: NodeKind, parent: NodeOffset, n_keys: usize) -> Result<Vec<u8>> {
        if n_keys > self.order - 1 {
            return Err(Error::invariant(format!(
                "node holds {} keys, order {} allows {}",
                n_keys,
                self.order,
                self.order - 1
            )));
        }
        let mut buf = Vec::with_capacity(self.node_size(kind));
        buf.push(kind as u8);
        buf.extend_from_slice(&parent.0.to_le_bytes());
        buf.extend_from_slice(&(n_keys as i32).to_le_bytes());
        Ok(buf)
    }

    fn finish(&self, kind: NodeKind, mut buf: Vec<u8>) -> Result<Vec<u8>> {
        let expected = self.node_size(kind);
        if buf.len() > expected {
            return Err(Error::invariant(format!(
                "encoded node is {} bytes, expected {}",
                buf.len(),
                expected
            )));
        }
        buf.resize(expected, 0);
        Ok(buf)
    }

    /// Decode a node previously written by [`encode`](Self::encode).
    ///
    /// `offset` is only used for error reporting.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` on an unknown discriminator, a buffer of
    /// the wrong size, or an out-of-range key count.
    pub fn decode(&self, data: &[u8], offset: u64) -> Result<Node> {
        let kind = data
            .first()
            .copied()
            .and_then(NodeKind::from_u8)
            .ok_or_else(|| Error::corrupt(offset, "unknown node discriminator"))?;

        let expected = self.node_size(kind);
        if data.len() != expected {
            return Err(Error::corrupt(
                offset,
                format!("node is {} bytes, expected {}", data.len(), expected),
            ));
        }

        let parent = NodeOffset::new(read_i64(data, Self::OFFSET_PARENT));
        let raw_n_keys = read_i32(data, Self::OFFSET_N_KEYS);
        let n_keys = usize::try_from(raw_n_keys)
            .ok()
            .filter(|&n| n < self.order)
            .ok_or_else(|| Error::corrupt(offset, format!("key count {} out of range", raw_n_keys)))?;
        let link = NodeOffset::new(read_i64(data, Self::OFFSET_LINK));

        let key_width = self.codec.width();
        let slots = (0..n_keys).map(|i| {
            let at = Self::OFFSET_SLOTS + i * self.slot_size();
            let key = self.codec.deserialize(&data[at..at + key_width]);
            let pointer = read_i64(data, at + key_width);
            key.map(|k| (k, pointer))
        });

        match kind {
            NodeKind::Leaf => {
                let entries = slots
                    .map(|slot| slot.map(|(key, pos)| LeafEntry::new(key, pos as u64)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Node::Leaf(LeafNode::new(parent, link, entries)))
            }
            NodeKind::Internal => {
                let mut keys = Vec::with_capacity(n_keys);
                let mut children = Vec::with_capacity(n_keys + 1);
                children.push(link);
                for slot in slots {
                    let (key, child) = slot?;
                    keys.push(key);
                    children.push(NodeOffset::new(child));
                }
                Ok(Node::Internal(InternalNode::new(parent, keys, children)))
            }
        }
    }
}

pub(crate) fn read_i64(data: &[u8], at: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    i64::from_le_bytes(buf)
}

pub(crate) fn read_i32(data: &[u8], at: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[at..at + 4]);
    i32::from_le_bytes(buf)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Key, KeyType};

    fn layout(order: usize, key_type: KeyType) -> NodeLayout {
        NodeLayout::new(order, KeyCodec::new(key_type).unwrap())
    }

    fn sample_leaf() -> Node {
        Node::Leaf(LeafNode::new(
            NodeOffset::new(20),
            NodeOffset::new(120),
            vec![
                LeafEntry::new(Key::Int(10), 4),
                LeafEntry::new(Key::Int(20), 42),
            ],
        ))
    }

    #[test]
    fn test_node_kind_from_u8() {
        assert_eq!(NodeKind::from_u8(0), Some(NodeKind::Internal));
        assert_eq!(NodeKind::from_u8(1), Some(NodeKind::Leaf));
        assert_eq!(NodeKind::from_u8(2), None);
    }

    #[test]
    fn test_node_sizes() {
        // leaf: 21 + 3 * (4 + 8); internal: 13 + 4 * 8 + 3 * 4
        let l = layout(4, KeyType::Int);
        assert_eq!(l.node_size(NodeKind::Leaf), 57);
        assert_eq!(l.node_size(NodeKind::Internal), 57);

        let l = layout(5, KeyType::Text(10));
        assert_eq!(l.node_size(NodeKind::Leaf), 21 + 4 * 18);
        assert_eq!(l.node_size(NodeKind::Internal), 13 + 5 * 8 + 4 * 10);
    }

    #[test]
    fn test_leaf_byte_layout() {
        let l = layout(4, KeyType::Int);
        let buf = l.encode(&sample_leaf()).unwrap();

        assert_eq!(buf.len(), 57);
        assert_eq!(buf[0], 1);
        assert_eq!(read_i64(&buf, NodeLayout::OFFSET_PARENT), 20);
        assert_eq!(read_i32(&buf, NodeLayout::OFFSET_N_KEYS), 2);
        assert_eq!(read_i64(&buf, NodeLayout::OFFSET_LINK), 120);
        assert_eq!(read_i32(&buf, 21), 10);
        assert_eq!(read_i64(&buf, 25), 4);
        assert_eq!(read_i32(&buf, 33), 20);
        assert_eq!(read_i64(&buf, 37), 42);
        // unused third slot is zeroed
        assert!(buf[45..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_internal_byte_layout() {
        let l = layout(4, KeyType::Int);
        let node = Node::Internal(InternalNode::new(
            NodeOffset::NONE,
            vec![Key::Int(30)],
            vec![NodeOffset::new(20), NodeOffset::new(77)],
        ));
        let buf = l.encode(&node).unwrap();

        assert_eq!(buf.len(), 57);
        assert_eq!(buf[0], 0);
        assert_eq!(read_i64(&buf, NodeLayout::OFFSET_PARENT), -1);
        assert_eq!(read_i32(&buf, NodeLayout::OFFSET_N_KEYS), 1);
        assert_eq!(read_i64(&buf, 13), 20);
        assert_eq!(read_i32(&buf, 21), 30);
        assert_eq!(read_i64(&buf, 25), 77);
    }

    #[test]
    fn test_roundtrip_both_kinds() {
        let l = layout(5, KeyType::Text(6));
        let leaf = Node::Leaf(LeafNode::new(
            NodeOffset::NONE,
            NodeOffset::NONE,
            vec![
                LeafEntry::new(Key::from("apple"), 4),
                LeafEntry::new(Key::from("kiwi"), 44),
            ],
        ));
        let internal = Node::Internal(InternalNode::new(
            NodeOffset::new(20),
            vec![Key::from("b"), Key::from("m"), Key::from("t")],
            vec![
                NodeOffset::new(100),
                NodeOffset::new(200),
                NodeOffset::new(300),
                NodeOffset::new(400),
            ],
        ));

        for node in [leaf, internal] {
            let buf = l.encode(&node).unwrap();
            assert_eq!(l.decode(&buf, 0).unwrap(), node);
        }
    }

    #[test]
    fn test_encode_rejects_overflowed_node() {
        let l = layout(3, KeyType::Int);
        let entries = (0..3).map(|k| LeafEntry::new(Key::Int(k), 0)).collect();
        let node = Node::Leaf(LeafNode::new(NodeOffset::NONE, NodeOffset::NONE, entries));
        assert!(matches!(l.encode(&node), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_encode_rejects_child_count_mismatch() {
        let l = layout(4, KeyType::Int);
        let node = Node::Internal(InternalNode::new(
            NodeOffset::NONE,
            vec![Key::Int(1)],
            vec![NodeOffset::new(20)],
        ));
        assert!(matches!(l.encode(&node), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_encode_rejects_wrong_key_type() {
        let l = layout(4, KeyType::Int);
        let node = Node::Leaf(LeafNode::new(
            NodeOffset::NONE,
            NodeOffset::NONE,
            vec![LeafEntry::new(Key::from("x"), 0)],
        ));
        assert!(matches!(l.encode(&node), Err(Error::Format(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let l = layout(4, KeyType::Int);
        let mut buf = l.encode(&sample_leaf()).unwrap();

        assert!(matches!(l.decode(&buf[..30], 20), Err(Error::CorruptFile { offset: 20, .. })));

        buf[NodeLayout::OFFSET_N_KEYS] = 9;
        assert!(matches!(l.decode(&buf, 20), Err(Error::CorruptFile { .. })));

        buf[0] = 7;
        assert!(matches!(l.decode(&buf, 20), Err(Error::CorruptFile { .. })));
    }
}
