//! Error types for the B+ tree index.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index.
///
/// Absent keys are not errors: lookups return `None` and deletes return
/// `false`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the node or record file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A key or record does not match the configured type or width.
    #[error("format error: {0}")]
    Format(String),

    /// The file is shorter than a header, node or record requires, or holds
    /// bytes that cannot be decoded.
    #[error("corrupt file at offset {offset}: {reason}")]
    CorruptFile { offset: u64, reason: String },

    /// Insert of a key that already exists in a unique index.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A structural invariant of the tree or its encoding does not hold.
    ///
    /// This indicates a bug, not a recoverable condition.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The tree configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptFile {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        Error::InvariantViolation(reason.into())
    }
}
