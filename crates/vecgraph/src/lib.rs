//! `vecgraph`
//!
//! A graph-based approximate nearest neighbor index for dense `f32` vectors.
//!
//! # Overview
//!
//! - **Vector storage**: append-only, dimension fixed by the first vector,
//!   dense ids in insertion order
//! - **Proximity graph**: bounded out-degree with relative-neighborhood
//!   pruning, stored as an arena of adjacency lists
//! - **Search**: greedy best-first walk with a tunable width and node budget
//! - **Build**: incremental linking on every add, then neighbor descent
//! - **Persistence**: two versioned byte streams (vectors and graph); I/O is
//!   left to the caller
//!
//! # Example
//!
//! ```
//! use vecgraph::{AnnIndex, BuildState};
//!
//! let index = AnnIndex::new();
//! index.add(&[0.0, 0.0]).unwrap();
//! index.add(&[1.0, 0.0]).unwrap();
//! index.add(&[0.0, 1.0]).unwrap();
//! assert_eq!(index.state().unwrap(), BuildState::Staged);
//!
//! index.build().unwrap();
//! let ids = index.search_ids(&[0.9, 0.1], 1).unwrap();
//! assert_eq!(ids[0].as_u32(), 1);
//! ```
//!
//! # Modules
//!
//! - [`store`] - Vector storage
//! - [`index`] - Graph, search, build, persistence and the [`AnnIndex`] facade
//! - [`distance`] - Distance functions
//! - [`types`] - Ids, build state and value validation
//! - [`error`] - Error types

pub mod distance;
pub mod error;
pub mod index;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use distance::DistanceMetric;
pub use error::{IndexError, IndexResult};
pub use index::{
    AnnIndex, BuildReport, EntryPointPolicy, Graph, IndexConfig, RefineConfig, SearchResult,
    VectorIndex,
};
pub use store::VectorStore;
pub use types::{BuildState, VectorId};
