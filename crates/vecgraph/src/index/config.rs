//! Index configuration.

use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::{IndexError, IndexResult};

/// Configuration parameters for an index.
///
/// # Parameters
///
/// * `max_degree` - Maximum out-degree of every node. Typical values: 16-64.
///   Higher values give better recall but use more memory and slow inserts.
///
/// * `ef_construction` - Search width used to find neighbors when a vector is
///   inserted. Higher values give a better initial graph but slower adds.
///
/// * `ef_search` - Default search width. Can be overridden per query and is
///   always raised to at least `k`.
///
/// * `max_visits` - Node budget per search (0 = unlimited). Bounds latency at
///   the cost of recall.
///
/// * `refine` - Stopping policy for the neighbor-descent pass run by `build`.
///
/// * `entry_point` - How `build` picks the node where every search starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum number of neighbors per node.
    pub max_degree: usize,
    /// Search width for insertion.
    pub ef_construction: usize,
    /// Default search width for queries.
    pub ef_search: usize,
    /// Per-search node budget, 0 for unlimited.
    pub max_visits: usize,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Refinement stopping policy.
    pub refine: RefineConfig,
    /// Entry point selection policy.
    pub entry_point: EntryPointPolicy,
    /// Fill free adjacency slots with candidates the diversification rule
    /// rejected.
    pub keep_pruned: bool,
}

impl IndexConfig {
    /// Create a configuration with the given maximum out-degree.
    ///
    /// Other parameters are set to defaults:
    /// - `ef_construction` = 100
    /// - `ef_search` = 100
    /// - `max_visits` = 0 (unlimited)
    /// - Euclidean metric, medoid entry point, no pruned refill
    #[must_use]
    pub fn new(max_degree: usize) -> Self {
        Self {
            max_degree: max_degree.max(2),
            ef_construction: 100,
            ef_search: 100,
            max_visits: 0,
            metric: DistanceMetric::Euclidean,
            refine: RefineConfig::default(),
            entry_point: EntryPointPolicy::Medoid,
            keep_pruned: false,
        }
    }

    /// Set the search width used during insertion.
    #[must_use]
    pub const fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set the default search width.
    #[must_use]
    pub const fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    /// Set the per-search node budget (0 = unlimited).
    #[must_use]
    pub const fn with_max_visits(mut self, max_visits: usize) -> Self {
        self.max_visits = max_visits;
        self
    }

    /// Set the distance metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the refinement policy.
    #[must_use]
    pub const fn with_refine(mut self, refine: RefineConfig) -> Self {
        self.refine = refine;
        self
    }

    /// Set the entry point policy.
    #[must_use]
    pub const fn with_entry_point(mut self, policy: EntryPointPolicy) -> Self {
        self.entry_point = policy;
        self
    }

    /// Refill adjacency lists with diversification rejects.
    #[must_use]
    pub const fn with_keep_pruned(mut self, keep: bool) -> Self {
        self.keep_pruned = keep;
        self
    }

    /// Check the configuration for values the index cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> IndexResult<()> {
        if self.max_degree < 2 {
            return Err(IndexError::InvalidConfig(format!(
                "max_degree must be at least 2, got {}",
                self.max_degree
            )));
        }
        if self.ef_construction == 0 {
            return Err(IndexError::InvalidConfig("ef_construction must be positive".into()));
        }
        if self.ef_search == 0 {
            return Err(IndexError::InvalidConfig("ef_search must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.refine.min_churn) {
            return Err(IndexError::InvalidConfig(format!(
                "min_churn must be within [0, 1], got {}",
                self.refine.min_churn
            )));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    /// Uses a max degree of 32.
    fn default() -> Self {
        Self::new(32)
    }
}

/// When the neighbor-descent pass stops.
///
/// Refinement runs at most `max_rounds` rounds and stops early once the
/// fraction of adjacency slots that changed in a round drops below
/// `min_churn`. Setting `min_churn` to 0 always runs every round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Upper bound on rounds.
    pub max_rounds: usize,
    /// Convergence threshold on changed edges per round, in `[0, 1]`.
    pub min_churn: f64,
    /// Also consider nodes that point at a node as its candidates.
    pub include_reverse: bool,
}

impl RefineConfig {
    /// Run exactly `rounds` rounds, ignoring convergence.
    #[must_use]
    pub const fn fixed(rounds: usize) -> Self {
        Self { max_rounds: rounds, min_churn: 0.0, include_reverse: true }
    }

    /// Skip refinement entirely; `build` only picks the entry point.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::fixed(0)
    }
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self { max_rounds: 4, min_churn: 0.001, include_reverse: true }
    }
}

/// How `build` selects the search entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryPointPolicy {
    /// The node closest to the centroid of all vectors.
    #[default]
    Medoid,
    /// The node with the most out-edges, lowest id on ties.
    HighestDegree,
    /// Always id 0.
    First,
}
