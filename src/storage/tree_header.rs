//! Node-file header.

use crate::common::config::{MAX_ORDER, MIN_ORDER, TREE_HEADER_SIZE};
use crate::common::{Error, NodeOffset, Result};

use super::node::{read_i32, read_i64};

/// Metadata stored at byte 0 of the node file.
///
/// # Layout (20 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     root (i64, -1 if the tree is empty)
/// 8       4     order (i32)
/// 12      4     n_internal (i32)
/// 16      4     n_leaf (i32)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    pub root: NodeOffset,
    pub order: usize,
    /// Internal nodes ever appended (merged-away nodes still count).
    pub n_internal: u32,
    /// Leaf nodes ever appended.
    pub n_leaf: u32,
}

impl TreeHeader {
    pub const SIZE: usize = TREE_HEADER_SIZE;

    pub const OFFSET_ROOT: usize = 0;
    pub const OFFSET_ORDER: usize = 8;
    pub const OFFSET_N_INTERNAL: usize = 12;
    pub const OFFSET_N_LEAF: usize = 16;

    /// Header of an empty tree.
    pub fn new(order: usize) -> Self {
        Self {
            root: NodeOffset::NONE,
            order,
            n_internal: 0,
            n_leaf: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` if the slice is too short or a field is
    /// out of range.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::corrupt(
                0,
                format!("header is {} bytes, expected {}", data.len(), Self::SIZE),
            ));
        }

        let root = NodeOffset::new(read_i64(data, Self::OFFSET_ROOT));
        let order = usize::try_from(read_i32(data, Self::OFFSET_ORDER))
            .ok()
            .filter(|o| (MIN_ORDER..=MAX_ORDER).contains(o))
            .ok_or_else(|| Error::corrupt(Self::OFFSET_ORDER as u64, "order out of range"))?;
        let n_internal = u32::try_from(read_i32(data, Self::OFFSET_N_INTERNAL))
            .map_err(|_| Error::corrupt(Self::OFFSET_N_INTERNAL as u64, "negative node count"))?;
        let n_leaf = u32::try_from(read_i32(data, Self::OFFSET_N_LEAF))
            .map_err(|_| Error::corrupt(Self::OFFSET_N_LEAF as u64, "negative node count"))?;

        Ok(Self {
            root,
            order,
            n_internal,
            n_leaf,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut data = [0u8; Self::SIZE];
        data[Self::OFFSET_ROOT..Self::OFFSET_ROOT + 8].copy_from_slice(&self.root.0.to_le_bytes());
        data[Self::OFFSET_ORDER..Self::OFFSET_ORDER + 4]
            .copy_from_slice(&(self.order as i32).to_le_bytes());
        data[Self::OFFSET_N_INTERNAL..Self::OFFSET_N_INTERNAL + 4]
            .copy_from_slice(&(self.n_internal as i32).to_le_bytes());
        data[Self::OFFSET_N_LEAF..Self::OFFSET_N_LEAF + 4]
            .copy_from_slice(&(self.n_leaf as i32).to_le_bytes());
        data
    }

    /// Total nodes appended to the file.
    pub fn node_count(&self) -> u64 {
        u64::from(self.n_internal) + u64::from(self.n_leaf)
    }
}
