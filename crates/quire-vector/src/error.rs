//! Error types for quire-vector.

use thiserror::Error;

/// Result type for quire-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quire-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Dimension mismatch between a vector and the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (e.g., empty, contains NaN).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// A record id was inserted twice into the same builder.
    #[error("Duplicate record id '{0}'")]
    DuplicateId(String),

    /// A caller-supplied parameter is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Search was issued against an index holding no records.
    #[error("Index is empty")]
    EmptyIndex,

    /// The snapshot directory or one of its files does not exist.
    #[error("Index snapshot not found at {0}")]
    NotFound(String),

    /// The snapshot exists but its contents fail validation.
    #[error("Index snapshot is corrupted: {0}")]
    Corrupted(String),

    /// Persistence error (serialization, unsupported format, etc.).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
