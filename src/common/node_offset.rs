//! Node identifier type.

use std::fmt;

/// Byte offset of a record in the data file.
pub type RecordPosition = u64;

/// Identifies a node by its byte offset in the node file.
///
/// Nodes never hold references to each other; every parent, child and
/// sibling link is one of these offsets resolved through the node store.
/// The on-disk sentinel for "no node" is `-1`.
///
/// # Example
/// ```
/// use bptree_index::NodeOffset;
///
/// let offset = NodeOffset::new(20);
/// assert!(offset.is_valid());
/// assert!(!NodeOffset::NONE.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeOffset(pub i64);

impl NodeOffset {
    /// Sentinel for a missing parent, sibling or root.
    pub const NONE: NodeOffset = NodeOffset(-1);

    /// Create a new NodeOffset.
    #[inline]
    pub fn new(offset: i64) -> Self {
        NodeOffset(offset)
    }

    /// Check if this offset points at a node (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// The offset as an unsigned file position.
    ///
    /// Only meaningful for valid offsets.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0.max(0) as u64
    }
}

impl fmt::Display for NodeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Node({})", self.0)
        } else {
            write!(f, "Node(NONE)")
        }
    }
}
