//! Index build state.

use std::fmt;

/// Lifecycle of an index graph.
///
/// `Empty -> Staged` on the first add, `Staged -> Built` on build, and back
/// to `Staged` when vectors are added to a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildState {
    /// No vectors.
    #[default]
    Empty,
    /// Vectors are linked incrementally but the graph has not been refined.
    Staged,
    /// The refinement pass has run over every vector.
    Built,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Staged => "staged",
            Self::Built => "built",
        };
        f.write_str(s)
    }
}
