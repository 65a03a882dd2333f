//! Common types and utilities shared across the index.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`TreeConfig`](config::TreeConfig)
//! - Error types
//! - Node identifiers ([`NodeOffset`])
//! - Operation statistics ([`TreeStats`])

pub mod config;
pub mod error;
mod node_offset;
mod stats;

pub use error::{Error, Result};
pub use node_offset::{NodeOffset, RecordPosition};
pub use stats::{StatsSnapshot, TreeStats};
