//! bptree-index - a disk-resident B+ tree index over fixed-width keys.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Table (index/)                           │
//! │          unique TreeIndex  +  RecordStore  +  RecordCodec       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────┐  ┌──────────────────────────┐  │
//! │  │   TreeIndex (index/btree/)  │  │   RecordFile (storage/)  │  │
//! │  │ search / insert / delete    │  │  fixed slots, CRC32,     │  │
//! │  │ range / verify              │  │  tombstones              │  │
//! │  └──────────────┬──────────────┘  └────────────┬─────────────┘  │
//! │                 ↓                              ↓                │
//! │  ┌─────────────────────────────┐          data file             │
//! │  │   NodeStore (storage/)      │                                │
//! │  │ header + nodes by offset    │                                │
//! │  └──────────────┬──────────────┘                                │
//! │                 ↓                                               │
//! │             node file                                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeOffset, Error, config, statistics)
//! - [`storage`] - Node file, node layout and record file
//! - [`index`] - Keys, the B+ tree and the clustered table
//! - [`record`] - Record codec and store traits, sample `Product` record
//!
//! # Quick Start
//! ```no_run
//! use bptree_index::{Key, KeyType, TreeConfig, TreeIndex};
//!
//! let config = TreeConfig::new(KeyType::Int).with_order(4);
//! let mut tree = TreeIndex::open_or_create("index.db", config).unwrap();
//!
//! tree.insert(Key::Int(42), 1024).unwrap();
//! let hits = tree.range_search(&Key::Int(0), &Key::Int(100)).unwrap();
//! assert_eq!(hits, vec![1024]);
//! ```

pub mod common;
pub mod index;
pub mod record;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{TreeConfig, DEFAULT_ORDER};
pub use common::{Error, NodeOffset, RecordPosition, Result, StatsSnapshot, TreeStats};

pub use index::{Key, KeyCodec, KeyType, Table, TreeIndex};
pub use record::{Product, ProductCodec, RecordCodec, RecordStore};
pub use storage::{NodeStore, RecordFile};
