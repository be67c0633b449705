//! Greedy best-first search over the proximity graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::distance::DistanceMetric;
use crate::store::VectorStore;
use crate::types::VectorId;

use super::graph::{sort_candidates, Candidate, Graph, MaxCandidate};

/// Stored vectors paired with the metric that compares them.
#[derive(Debug, Clone, Copy)]
pub struct Space<'a> {
    store: &'a VectorStore,
    metric: DistanceMetric,
}

impl<'a> Space<'a> {
    /// Create a new space view.
    #[must_use]
    pub const fn new(store: &'a VectorStore, metric: DistanceMetric) -> Self {
        Self { store, metric }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &'a VectorStore {
        self.store
    }

    /// The metric in use.
    #[must_use]
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Distance between two stored vectors.
    #[inline]
    #[must_use]
    pub fn distance(&self, a: VectorId, b: VectorId) -> f32 {
        self.metric.distance(self.store.vector(a), self.store.vector(b))
    }

    /// Distance from an external query to a stored vector.
    #[inline]
    #[must_use]
    pub fn distance_to(&self, query: &[f32], id: VectorId) -> f32 {
        self.metric.distance(query, self.store.vector(id))
    }
}

/// Best-first search from `entry_points`, returning up to `width` candidates.
///
/// The frontier is expanded closest first. A newly seen node joins the
/// frontier only if it beats the worst of the `width` results kept so far;
/// the walk stops once the closest unexpanded candidate is worse than that,
/// or after `max_visits` distance evaluations (0 = unlimited).
///
/// Results are sorted by ascending distance, lower id first on ties, and
/// contain no duplicates. Entry points outside the graph are ignored.
pub fn greedy_search(
    space: Space<'_>,
    graph: &Graph,
    query: &[f32],
    entry_points: &[VectorId],
    width: usize,
    max_visits: usize,
) -> Vec<Candidate> {
    let width = width.max(1);
    let budget = if max_visits == 0 { usize::MAX } else { max_visits };

    let mut visited = vec![false; graph.len()];
    let mut visits = 0usize;
    let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut results: BinaryHeap<MaxCandidate> = BinaryHeap::new();

    for &ep in entry_points {
        if ep.index() >= graph.len() || visited[ep.index()] || visits >= budget {
            continue;
        }
        visited[ep.index()] = true;
        visits += 1;

        let candidate = Candidate::new(ep, space.distance_to(query, ep));
        frontier.push(candidate);
        keep_best(&mut results, candidate, width);
    }

    'walk: while let Some(current) = frontier.pop() {
        // Local optimum: nothing left that can improve the result set
        if results.peek().is_some_and(|worst| current.closer(&worst.0) == Ordering::Greater) {
            break;
        }

        for &neighbor in graph.neighbors_of(current.id) {
            if visited[neighbor.index()] {
                continue;
            }
            if visits >= budget {
                break 'walk;
            }
            visited[neighbor.index()] = true;
            visits += 1;

            let candidate = Candidate::new(neighbor, space.distance_to(query, neighbor));
            let improves = results.len() < width
                || results.peek().is_some_and(|worst| candidate.closer(&worst.0) == Ordering::Less);

            if improves {
                frontier.push(candidate);
                keep_best(&mut results, candidate, width);
            }
        }
    }

    let mut found: Vec<Candidate> = results.into_iter().map(|mc| mc.0).collect();
    sort_candidates(&mut found);
    found
}

/// Push into a bounded max-heap, evicting the worst entry on overflow.
#[inline]
fn keep_best(results: &mut BinaryHeap<MaxCandidate>, candidate: Candidate, width: usize) {
    results.push(MaxCandidate(candidate));
    if results.len() > width {
        results.pop();
    }
}

/// Brute-force k nearest neighbors over every stored vector.
///
/// Exact but linear; used to validate recall and for very small indexes.
pub fn exact_search(space: Space<'_>, query: &[f32], k: usize) -> Vec<Candidate> {
    if k == 0 {
        return Vec::new();
    }
    let mut results: BinaryHeap<MaxCandidate> = BinaryHeap::with_capacity(k + 1);
    for (id, vector) in space.store().iter() {
        keep_best(&mut results, Candidate::new(id, space.metric().distance(query, vector)), k);
    }
    let mut found: Vec<Candidate> = results.into_iter().map(|mc| mc.0).collect();
    sort_candidates(&mut found);
    found
}
