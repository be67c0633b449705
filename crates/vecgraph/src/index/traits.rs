//! Traits for vector indexes.

use crate::error::IndexError;
use crate::types::VectorId;

use super::builder::BuildReport;

/// Result of a similarity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Id of the matching vector.
    pub id: VectorId,
    /// Distance to the query under the index metric (lower is closer).
    pub distance: f32,
}

impl SearchResult {
    /// Create a new search result.
    #[must_use]
    pub const fn new(id: VectorId, distance: f32) -> Self {
        Self { id, distance }
    }
}

/// Trait for approximate nearest neighbor indexes.
///
/// Ids are dense and assigned in insertion order; there is no removal.
pub trait VectorIndex {
    /// Append a vector and link it into the graph, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector's length differs from the index
    /// dimension or it contains a non-finite value. The index is unchanged
    /// on error.
    fn add(&self, vector: &[f32]) -> Result<VectorId, IndexError>;

    /// Append several vectors.
    ///
    /// The default implementation adds them one at a time and stops at the
    /// first error, keeping the vectors added before it. Implementations
    /// that can validate the whole batch up front should override it.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`add`](Self::add).
    fn add_batch(&self, vectors: &[&[f32]]) -> Result<Vec<VectorId>, IndexError> {
        vectors.iter().map(|v| self.add(v)).collect()
    }

    /// Refine the graph and mark the index built. A no-op on an empty or
    /// already built index.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index is in an unusable state.
    fn build(&self) -> Result<BuildReport, IndexError>;

    /// Search for the k nearest neighbors of `query`.
    ///
    /// # Arguments
    ///
    /// * `query` - The query vector
    /// * `k` - The number of nearest neighbors to return
    /// * `width` - Optional search width (uses the configured default if None)
    ///
    /// # Returns
    ///
    /// At most `k` results, sorted by distance (closest first), without
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyIndex`] if no vectors are stored, or a
    /// validation error if the query is malformed.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        width: Option<usize>,
    ) -> Result<Vec<SearchResult>, IndexError>;

    /// Number of stored vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if there's a concurrency error (lock poisoning).
    fn len(&self) -> Result<usize, IndexError>;

    /// Check if the index is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if there's a concurrency error (lock poisoning).
    fn is_empty(&self) -> Result<bool, IndexError> {
        self.len().map(|n| n == 0)
    }

    /// Dimension fixed by the first vector, `None` while empty.
    ///
    /// # Errors
    ///
    /// Returns an error if there's a concurrency error (lock poisoning).
    fn dimension(&self) -> Result<Option<usize>, IndexError>;
}
