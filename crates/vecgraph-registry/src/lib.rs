//! `vecgraph-registry`
//!
//! A name-keyed table of [`AnnIndex`](vecgraph::AnnIndex) instances.
//!
//! The registry is an ordinary value: create one, hand it (or an `Arc` of
//! it) to whatever needs to look indexes up by name, and drop it when done.
//! It owns lifetime and dispatch only; every algorithm lives in `vecgraph`.
//!
//! # Example
//!
//! ```
//! use vecgraph_registry::IndexRegistry;
//!
//! let registry = IndexRegistry::new();
//! registry.create("points").unwrap();
//! registry.add("points", &[0.0, 0.0]).unwrap();
//! registry.add("points", &[1.0, 0.0]).unwrap();
//! registry.build("points").unwrap();
//!
//! let hits = registry.search("points", &[0.9, 0.0], 1).unwrap();
//! assert_eq!(hits[0].id.as_u32(), 1);
//! ```

mod error;
mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::IndexRegistry;
