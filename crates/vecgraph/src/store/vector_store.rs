//! Columnar vector store implementation.

use crate::error::{IndexError, IndexResult};
use crate::types::{validate_values, VectorId};

/// Append-only storage of fixed-dimension `f32` vectors.
///
/// The dimension is unset until the first append and fixed afterwards.
/// There is no removal and no in-place mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    /// Established dimension, 0 while the store is empty and unfixed.
    dimension: usize,
    /// All components, `len * dimension` floats.
    data: Vec<f32>,
    /// Number of stored vectors.
    len: usize,
}

impl VectorStore {
    /// Create an empty store with no fixed dimension.
    #[must_use]
    pub const fn new() -> Self {
        Self { dimension: 0, data: Vec::new(), len: 0 }
    }

    /// Rebuild a store from a flat component buffer.
    ///
    /// Used by the persistence codec, which has already validated `data`.
    pub(crate) fn from_flat(dimension: usize, data: Vec<f32>) -> Self {
        let len = if dimension == 0 { 0 } else { data.len() / dimension };
        Self { dimension, data, len }
    }

    /// The established dimension, or `None` before the first append.
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        (self.dimension > 0).then_some(self.dimension)
    }

    /// Number of stored vectors.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the store holds no vectors.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check that `vector` could be appended, without appending it.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`VectorStore::append`].
    pub fn check(&self, vector: &[f32]) -> IndexResult<()> {
        validate_values(vector)?;
        if self.dimension > 0 && vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.len >= VectorId::MAX_COUNT {
            return Err(IndexError::CapacityExceeded { max: VectorId::MAX_COUNT });
        }
        Ok(())
    }

    /// Append a vector and return its id.
    ///
    /// The first append fixes the store dimension.
    ///
    /// # Errors
    ///
    /// - [`IndexError::DimensionMismatch`] if the length differs from the
    ///   established dimension
    /// - [`IndexError::InvalidDimension`] / [`IndexError::InvalidValue`] for an
    ///   empty or non-finite vector
    /// - [`IndexError::CapacityExceeded`] when the id space is exhausted
    ///
    /// On error the store is unchanged.
    pub fn append(&mut self, vector: &[f32]) -> IndexResult<VectorId> {
        self.check(vector)?;
        let id = VectorId::from_index(self.len)
            .ok_or(IndexError::CapacityExceeded { max: VectorId::MAX_COUNT })?;

        if self.dimension == 0 {
            self.dimension = vector.len();
        }
        self.data.extend_from_slice(vector);
        self.len += 1;
        Ok(id)
    }

    /// Get the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `id` is not below [`len`](Self::len).
    pub fn get(&self, id: VectorId) -> IndexResult<&[f32]> {
        if id.index() >= self.len {
            return Err(IndexError::OutOfRange { id: id.index(), len: self.len });
        }
        Ok(self.vector(id))
    }

    /// Unchecked access for ids already known to be in range.
    ///
    /// Graph code only ever holds ids that were produced by this store.
    #[inline]
    pub(crate) fn vector(&self, id: VectorId) -> &[f32] {
        let start = id.index() * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Iterate over `(id, vector)` pairs in insertion order.
    #[allow(clippy::cast_possible_truncation)] // len never exceeds VectorId::MAX_COUNT
    pub fn iter(&self) -> impl Iterator<Item = (VectorId, &[f32])> + '_ {
        // An unfixed store has no data, so any non-zero chunk size yields nothing.
        self.data
            .chunks_exact(self.dimension.max(1))
            .enumerate()
            .map(|(i, row)| (VectorId::new(i as u32), row))
    }

    /// The flat component buffer, `len * dimension` floats.
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}
