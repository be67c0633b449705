//! Vector identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Permanent identifier of a stored vector.
///
/// Ids are assigned sequentially from 0 in insertion order and are never
/// reused. They are 32 bits wide, which is also their width on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VectorId(u32);

impl VectorId {
    /// Largest number of vectors an index can hold.
    pub const MAX_COUNT: usize = u32::MAX as usize;

    /// Create a new `VectorId` from a raw u32 value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Position of this id in the vector store.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Convert a store position into an id, if it fits.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }
}

impl From<u32> for VectorId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_conversion() {
        let id = VectorId::new(7);
        assert_eq!(id.index(), 7);
        assert_eq!(VectorId::from_index(7), Some(id));
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_from_index_overflow() {
        assert_eq!(VectorId::from_index(u32::MAX as usize + 1), None);
    }

    #[test]
    fn test_ids_are_ordered() {
        assert!(VectorId::new(1) < VectorId::new(2));
    }
}
