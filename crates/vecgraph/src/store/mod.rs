//! Vector storage.
//!
//! The [`VectorStore`] is an append-only columnar buffer: every vector of an
//! index lives back to back in one `Vec<f32>`, and a vector's position in
//! insertion order is its permanent [`VectorId`](crate::types::VectorId).
//!
//! # Example
//!
//! ```
//! use vecgraph::store::VectorStore;
//!
//! let mut store = VectorStore::new();
//! let id = store.append(&[1.0, 2.0]).unwrap();
//! assert_eq!(store.get(id).unwrap(), &[1.0, 2.0]);
//! assert_eq!(store.dimension(), Some(2));
//! ```

mod vector_store;

pub use vector_store::VectorStore;
