//! Core types: vector ids, value validation, and build state.

mod id;
mod state;
mod vector;

pub use id::VectorId;
pub use state::BuildState;
pub use vector::{validate_values, MAX_SQUARED_NORM};
