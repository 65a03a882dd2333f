//! Index structures.
//!
//! - [`KeyCodec`] - fixed-width key encoding and ordering
//! - [`TreeIndex`] - the disk-resident B+ tree
//! - [`Table`] - a unique tree paired with a record store

pub mod btree;
mod key;
mod table;

pub use btree::TreeIndex;
pub use key::{Key, KeyCodec, KeyType};
pub use table::Table;
