//! Error types for the registry.

use thiserror::Error;
use vecgraph::IndexError;

/// Errors that can occur in registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No index is registered under the name.
    #[error("index not found: {0}")]
    NotFound(String),

    /// The index rejected the operation.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Lock poisoned - a thread panicked while holding the registry lock.
    #[error("registry corrupted: lock poisoned due to prior panic in another thread")]
    LockPoisoned,
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
