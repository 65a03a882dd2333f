//! Configuration constants and tree settings.

use crate::common::{Error, Result};
use crate::index::KeyType;

/// Order used when none is given: at most 4 children, 3 keys per leaf.
pub const DEFAULT_ORDER: usize = 4;

/// Smallest order for which every non-root node keeps at least one key.
pub const MIN_ORDER: usize = 3;

/// Largest accepted order.
///
/// Bounds the node size computed from a header read off disk.
pub const MAX_ORDER: usize = 1 << 16;

/// Size of the node-file header in bytes.
///
/// `root: i64, order: i32, n_internal: i32, n_leaf: i32`
pub const TREE_HEADER_SIZE: usize = 20;

/// Size of the record-file header in bytes (`count: u32`).
pub const RECORD_HEADER_SIZE: usize = 4;

/// Settings for opening or creating a tree.
///
/// `order` only takes effect when a node file is created; an existing file
/// keeps the order stored in its header.
///
/// # Example
/// ```
/// use bptree_index::{KeyType, TreeConfig};
///
/// let config = TreeConfig::new(KeyType::Int).with_order(5).with_duplicates(true);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_keys(), 4);
/// assert_eq!(config.min_keys(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of children of an internal node.
    pub order: usize,

    /// Key variant stored in every node.
    pub key_type: KeyType,

    /// `false` rejects a second insert of the same key (clustered/primary
    /// index); `true` keeps equal keys side by side (secondary index).
    pub allow_duplicates: bool,
}

impl TreeConfig {
    /// Create a unique-key config with [`DEFAULT_ORDER`].
    pub fn new(key_type: KeyType) -> Self {
        Self {
            order: DEFAULT_ORDER,
            key_type,
            allow_duplicates: false,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Maximum keys in any node: `order - 1`.
    #[inline]
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum keys in a non-root node: `ceil(order / 2) - 1`.
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Check the order and key width.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the order is outside
    /// `MIN_ORDER..=MAX_ORDER` or a text key has zero width.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            return Err(Error::InvalidConfig(format!(
                "order {} outside {}..={}",
                self.order, MIN_ORDER, MAX_ORDER
            )));
        }
        if self.key_type.width() == 0 {
            return Err(Error::InvalidConfig("text keys need a non-zero width".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let config = TreeConfig::new(KeyType::Int);
        assert_eq!(config.order, DEFAULT_ORDER);
        assert!(!config.allow_duplicates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_occupancy_bounds() {
        let bounds = |order| {
            let c = TreeConfig::new(KeyType::Int).with_order(order);
            (c.min_keys(), c.max_keys())
        };
        assert_eq!(bounds(3), (1, 2));
        assert_eq!(bounds(4), (1, 3));
        assert_eq!(bounds(5), (2, 4));
        assert_eq!(bounds(8), (3, 7));
    }

    #[test]
    fn test_validate_rejects_small_order() {
        let config = TreeConfig::new(KeyType::Int).with_order(2);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_width_text() {
        let config = TreeConfig::new(KeyType::Text(0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
