//! Graph index for approximate nearest neighbor search.
//!
//! # Overview
//!
//! The index is a single-layer proximity graph over the vectors in a
//! [`VectorStore`](crate::store::VectorStore). Every node keeps a bounded,
//! diversified adjacency list; a query walks the graph greedily from one
//! entry point toward its nearest neighbors.
//!
//! Construction is split in two:
//!
//! - **Incremental insertion** (`add`): a new vector is linked to its nearest
//!   existing nodes immediately, so the index can always be searched.
//! - **Refinement** (`build`): rounds of neighbor descent replace weak edges
//!   with better ones found through neighbors of neighbors, then the entry
//!   point is chosen and unreachable nodes are reattached.
//!
//! # Configuration Parameters
//!
//! - **`max_degree`**: maximum neighbors per node (typically 16-64)
//! - **`ef_construction`**: search width while linking (higher = better graph, slower add)
//! - **`ef_search`**: default search width (higher = better recall, slower search)
//! - **`refine`**: neighbor descent rounds and convergence threshold
//!
//! # Example
//!
//! ```
//! use vecgraph::index::{AnnIndex, IndexConfig};
//!
//! let index = AnnIndex::with_config(IndexConfig::new(16)).unwrap();
//! for v in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [10.0, 10.0]] {
//!     index.add(&v).unwrap();
//! }
//! index.build().unwrap();
//!
//! let results = index.search(&[0.1, 0.1], 2).unwrap();
//! assert_eq!(results[0].id.as_u32(), 0);
//!
//! let (elements, graph) = index.save().unwrap();
//! let restored = AnnIndex::load(&elements, &graph).unwrap();
//! assert_eq!(restored.len().unwrap(), 4);
//! ```

mod ann;
mod builder;
mod config;
mod graph;
pub mod persistence;
mod search;
mod traits;

#[cfg(test)]
mod proptest_tests;

pub use ann::AnnIndex;
pub use builder::BuildReport;
pub use config::{EntryPointPolicy, IndexConfig, RefineConfig};
pub use graph::{select_neighbors, sort_candidates, Candidate, Graph, MaxCandidate};
pub use persistence::GraphHeader;
pub use search::{exact_search, greedy_search, Space};
pub use traits::{SearchResult, VectorIndex};
