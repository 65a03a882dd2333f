//! Application records stored beside the index.
//!
//! The tree itself only stores record positions. A [`RecordCodec`] turns an
//! application record into fixed-width bytes and names its key; a
//! [`RecordStore`] keeps those bytes and hands out stable positions.

mod product;

pub use product::{Product, ProductCodec};

use crate::common::{RecordPosition, Result};
use crate::index::Key;

/// Fixed-width encoding of one application record type.
pub trait RecordCodec {
    type Record;

    /// Encoded size of every record in bytes.
    fn record_size(&self) -> usize;

    /// Encode into exactly [`record_size`](Self::record_size) bytes.
    fn encode(&self, record: &Self::Record, out: &mut [u8]) -> Result<()>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Record>;

    /// The index key of a record.
    fn key(&self, record: &Self::Record) -> Key;
}

/// Storage for encoded records.
///
/// Positions returned by [`append`](Self::append) stay valid until that
/// record is removed; removing one record never moves another.
pub trait RecordStore {
    fn append(&mut self, bytes: &[u8]) -> Result<RecordPosition>;

    fn read(&mut self, position: RecordPosition) -> Result<Vec<u8>>;

    fn remove(&mut self, position: RecordPosition) -> Result<()>;

    /// Number of live records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
