//! Storage layer - node and record files.
//!
//! This module handles persistent storage:
//! - [`NodeStore`] - node file I/O and header maintenance
//! - [`node`] - node types and binary layout
//! - [`RecordFile`] - fixed-width record slots

pub mod node;
mod node_store;
mod record_file;
mod tree_header;

pub use node_store::NodeStore;
pub use record_file::RecordFile;
pub use tree_header::TreeHeader;
