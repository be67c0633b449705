//! Error types for the index crate.

use thiserror::Error;

/// Errors that can occur in index operations.
///
/// Every error is local to the call that produced it: a failed operation
/// leaves the index exactly as it was before the call.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Vector or query length disagrees with the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The expected dimension.
        expected: usize,
        /// The actual dimension.
        actual: usize,
    },

    /// Invalid dimension (e.g., zero).
    #[error("invalid dimension: expected at least {expected}, got {actual}")]
    InvalidDimension {
        /// The minimum expected dimension.
        expected: usize,
        /// The actual dimension.
        actual: usize,
    },

    /// Invalid value in a vector (NaN, Infinity).
    #[error("invalid value at index {index}: {value} - {reason}")]
    InvalidValue {
        /// The position of the invalid value.
        index: usize,
        /// The invalid value.
        value: f32,
        /// The reason the value is invalid.
        reason: &'static str,
    },

    /// Vector id beyond the current store length.
    #[error("vector id out of range: {id} >= {len}")]
    OutOfRange {
        /// The requested id.
        id: usize,
        /// The number of stored vectors.
        len: usize,
    },

    /// The index holds no vectors.
    #[error("index is empty")]
    EmptyIndex,

    /// A persisted stream failed structural validation.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Encoding error while writing a persisted stream.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The id space is exhausted.
    #[error("index capacity exceeded: at most {max} vectors")]
    CapacityExceeded {
        /// The maximum number of vectors.
        max: usize,
    },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lock poisoned - indicates concurrent panic corrupted the data structure.
    ///
    /// This error is unrecoverable - the index must be dropped and recreated.
    #[error("index corrupted: lock poisoned due to prior panic in another thread")]
    LockPoisoned,
}

impl IndexError {
    /// Shorthand for a [`IndexError::CorruptData`] error.
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
