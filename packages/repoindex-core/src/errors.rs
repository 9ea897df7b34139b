//! Error types for repoindex-core
//!
//! A single tagged error type covers the whole crate. Query parse problems
//! never reach callers (the query creator falls back to its legacy path),
//! and an exceeded hit limit is a sentinel result value, not an error.

use thiserror::Error;

/// Main error type for indexing and search operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index structure is damaged. The owning context closes itself
    /// without deleting files; recovery requires `purge` or `replace`.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// An existing index directory cannot be adopted: it carries no
    /// descriptor, a descriptor for another repository, or an index
    /// version this build does not understand.
    #[error("unsupported existing index: {0}")]
    UnsupportedExistingIndex(String),

    /// Transient filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The context was closed (explicitly, or after a failed commit) and
    /// must be reopened before further use.
    #[error("indexing context is closed")]
    Closed,
}

impl IndexError {
    /// Create a corrupt-index error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        IndexError::Corrupt(msg.into())
    }

    /// Create an unsupported-existing-index error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        IndexError::UnsupportedExistingIndex(msg.into())
    }
}

impl From<zip::result::ZipError> for IndexError {
    fn from(e: zip::result::ZipError) -> Self {
        IndexError::Io(std::io::Error::from(e))
    }
}

impl From<tantivy::TantivyError> for IndexError {
    fn from(e: tantivy::TantivyError) -> Self {
        use tantivy::TantivyError;

        match e {
            TantivyError::IoError(io) => {
                IndexError::Io(std::io::Error::new(io.kind(), io.to_string()))
            }
            locked @ TantivyError::LockFailure(..) => IndexError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                locked.to_string(),
            )),
            other => IndexError::Corrupt(other.to_string()),
        }
    }
}

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, IndexError>;
