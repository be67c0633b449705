//! Proximity graph data structure.
//!
//! The graph is an arena: node `i` is the vector with id `i`, and its
//! adjacency list is `adjacency[i]`. Nodes refer to each other only by
//! [`VectorId`], never by reference, so the (highly cyclic) graph has a
//! single owner.
//!
//! Edges are directed. The builder keeps them symmetric where it can, but
//! pruning one side never touches the other.

use std::cmp::Ordering;

use crate::error::{IndexError, IndexResult};
use crate::types::VectorId;

/// Adjacency lists indexed by vector id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    adjacency: Vec<Vec<VectorId>>,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self { adjacency: Vec::new() }
    }

    /// Rebuild a graph from already validated adjacency lists.
    pub(crate) fn from_adjacency(adjacency: Vec<Vec<VectorId>>) -> Self {
        Self { adjacency }
    }

    /// Number of nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Check if the graph has no nodes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Append an isolated node and return its id.
    ///
    /// The caller keeps node ids in step with the vector store.
    pub(crate) fn add_node(&mut self) -> VectorId {
        #[allow(clippy::cast_possible_truncation)] // bounded by the store capacity check
        let id = VectorId::new(self.adjacency.len() as u32);
        self.adjacency.push(Vec::new());
        id
    }

    fn check(&self, id: VectorId) -> IndexResult<()> {
        if id.index() >= self.adjacency.len() {
            return Err(IndexError::OutOfRange { id: id.index(), len: self.adjacency.len() });
        }
        Ok(())
    }

    /// The adjacency list of `id`, in the order it was last selected.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] for an unknown id.
    pub fn neighbors(&self, id: VectorId) -> IndexResult<&[VectorId]> {
        self.check(id)?;
        Ok(&self.adjacency[id.index()])
    }

    /// Adjacency of an id known to be in range.
    #[inline]
    pub(crate) fn neighbors_of(&self, id: VectorId) -> &[VectorId] {
        self.adjacency.get(id.index()).map_or(&[][..], Vec::as_slice)
    }

    /// Out-degree of an id known to be in range.
    #[inline]
    pub(crate) fn degree(&self, id: VectorId) -> usize {
        self.neighbors_of(id).len()
    }

    /// Add the edge `a -> b`.
    ///
    /// Returns `true` if the edge was added, `false` if it already existed.
    /// Self loops are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if either id is unknown.
    pub fn connect(&mut self, a: VectorId, b: VectorId) -> IndexResult<bool> {
        self.check(a)?;
        self.check(b)?;
        if a == b {
            return Ok(false);
        }
        let list = &mut self.adjacency[a.index()];
        if list.contains(&b) {
            return Ok(false);
        }
        list.push(b);
        Ok(true)
    }

    /// Remove the edge `a -> b` if present.
    pub(crate) fn disconnect(&mut self, a: VectorId, b: VectorId) {
        if let Some(list) = self.adjacency.get_mut(a.index()) {
            list.retain(|&n| n != b);
        }
    }

    /// Replace the adjacency list of an id known to be in range.
    pub(crate) fn set_neighbors(&mut self, id: VectorId, neighbors: Vec<VectorId>) {
        if let Some(list) = self.adjacency.get_mut(id.index()) {
            *list = neighbors;
        }
    }

    /// Reduce the adjacency of `id` to at most `max_degree` diverse neighbors.
    ///
    /// Neighbors are ranked by `distance_fn(id, neighbor)`. Walking from the
    /// closest, a neighbor is dropped when it is closer to an already kept
    /// neighbor than to `id` itself. The kept list is stored closest first.
    ///
    /// Returns `true` if the adjacency changed.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] for an unknown id.
    pub fn prune<F>(&mut self, id: VectorId, max_degree: usize, distance_fn: F) -> IndexResult<bool>
    where
        F: Fn(VectorId, VectorId) -> f32,
    {
        self.prune_with(id, max_degree, false, distance_fn)
    }

    /// [`prune`](Self::prune), optionally refilling free slots with the
    /// closest rejected neighbors.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] for an unknown id.
    pub fn prune_with<F>(
        &mut self,
        id: VectorId,
        max_degree: usize,
        keep_pruned: bool,
        distance_fn: F,
    ) -> IndexResult<bool>
    where
        F: Fn(VectorId, VectorId) -> f32,
    {
        self.check(id)?;
        let mut candidates: Vec<Candidate> = self.adjacency[id.index()]
            .iter()
            .map(|&n| Candidate::new(n, distance_fn(id, n)))
            .collect();
        sort_candidates(&mut candidates);

        let kept = select_neighbors(&candidates, max_degree, keep_pruned, &distance_fn);
        let changed = kept != self.adjacency[id.index()];
        self.adjacency[id.index()] = kept;
        Ok(changed)
    }

    /// Total number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Largest out-degree of any node.
    #[must_use]
    pub fn max_out_degree(&self) -> usize {
        self.adjacency.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// For every node, the nodes that list it as a neighbor (ascending ids).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // node count fits in u32
    pub fn reverse_adjacency(&self) -> Vec<Vec<VectorId>> {
        let mut reverse = vec![Vec::new(); self.adjacency.len()];
        for (src, list) in self.adjacency.iter().enumerate() {
            for &dst in list {
                if let Some(r) = reverse.get_mut(dst.index()) {
                    r.push(VectorId::new(src as u32));
                }
            }
        }
        reverse
    }

    /// Nodes reachable from `start` by following out-edges.
    #[must_use]
    pub fn reachable_from(&self, start: VectorId) -> Vec<bool> {
        let mut seen = vec![false; self.adjacency.len()];
        self.mark_reachable(start, &mut seen);
        seen
    }

    /// Extend `seen` with everything reachable from `start`.
    pub(crate) fn mark_reachable(&self, start: VectorId, seen: &mut [bool]) {
        if start.index() >= seen.len() || seen[start.index()] {
            return;
        }
        seen[start.index()] = true;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &n in self.neighbors_of(node) {
                if !seen[n.index()] {
                    seen[n.index()] = true;
                    stack.push(n);
                }
            }
        }
    }

    /// All adjacency lists, indexed by id.
    #[must_use]
    pub fn adjacency(&self) -> &[Vec<VectorId>] {
        &self.adjacency
    }
}

/// A node and its distance to some reference point.
///
/// Candidates order by distance, then by id, so equal distances resolve
/// deterministically toward the lower id.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// The candidate node.
    pub id: VectorId,
    /// Distance to the reference point.
    pub distance: f32,
}

impl Candidate {
    /// Create a new candidate.
    #[inline]
    #[must_use]
    pub const fn new(id: VectorId, distance: f32) -> Self {
        Self { id, distance }
    }

    /// Total order: closer first, then lower id.
    #[inline]
    #[must_use]
    pub fn closer(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialEq for Candidate {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.closer(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    /// Reversed so that `BinaryHeap<Candidate>` pops the closest first.
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other.closer(self)
    }
}

/// A max-heap candidate for tracking the worst element in the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxCandidate(pub Candidate);

impl PartialOrd for MaxCandidate {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MaxCandidate {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.closer(&other.0)
    }
}

/// Sort candidates closest first, lower id on ties.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_unstable_by(Candidate::closer);
}

/// Pick up to `max_degree` diverse neighbors from `candidates`.
///
/// `candidates` must be sorted with [`sort_candidates`] and carry their
/// distance to the node being linked. A candidate is rejected when
/// `distance_fn(candidate, kept)` is smaller than its own distance for some
/// already kept neighbor. With `keep_pruned`, rejected candidates fill the
/// remaining slots in order.
pub fn select_neighbors<F>(
    candidates: &[Candidate],
    max_degree: usize,
    keep_pruned: bool,
    distance_fn: F,
) -> Vec<VectorId>
where
    F: Fn(VectorId, VectorId) -> f32,
{
    let mut selected: Vec<VectorId> = Vec::with_capacity(max_degree.min(candidates.len()));
    let mut rejected: Vec<VectorId> = Vec::new();

    for candidate in candidates {
        if selected.len() >= max_degree {
            break;
        }
        if selected.contains(&candidate.id) {
            continue;
        }

        let dominated =
            selected.iter().any(|&kept| distance_fn(candidate.id, kept) < candidate.distance);

        if dominated {
            if keep_pruned {
                rejected.push(candidate.id);
            }
        } else {
            selected.push(candidate.id);
        }
    }

    if keep_pruned {
        let free = max_degree.saturating_sub(selected.len());
        selected.extend(rejected.into_iter().take(free));
    }

    selected
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    fn id(i: u32) -> VectorId {
        VectorId::new(i)
    }

    fn graph_with(n: usize) -> Graph {
        let mut graph = Graph::new();
        for _ in 0..n {
            graph.add_node();
        }
        graph
    }

    /// Points on a line; distance is the absolute gap.
    fn line_distance(points: &'static [f32]) -> impl Fn(VectorId, VectorId) -> f32 {
        move |a, b| (points[a.index()] - points[b.index()]).abs()
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut graph = graph_with(3);

        assert!(graph.connect(id(0), id(1)).unwrap());
        assert!(!graph.connect(id(0), id(1)).unwrap());
        assert!(!graph.connect(id(0), id(0)).unwrap());
        assert_eq!(graph.neighbors(id(0)).unwrap(), &[id(1)]);
        assert!(graph.neighbors(id(1)).unwrap().is_empty());
    }

    #[test]
    fn test_connect_out_of_range() {
        let mut graph = graph_with(2);
        assert!(matches!(
            graph.connect(id(0), id(5)),
            Err(IndexError::OutOfRange { id: 5, len: 2 })
        ));
        assert!(graph.neighbors(id(2)).is_err());
    }

    #[test]
    fn test_disconnect_and_set() {
        let mut graph = graph_with(3);
        graph.connect(id(0), id(1)).unwrap();
        graph.connect(id(0), id(2)).unwrap();
        graph.disconnect(id(0), id(1));
        assert_eq!(graph.neighbors(id(0)).unwrap(), &[id(2)]);

        graph.set_neighbors(id(1), vec![id(0), id(2)]);
        assert_eq!(graph.degree(id(1)), 2);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.max_out_degree(), 2);
    }

    #[test]
    fn test_prune_keeps_closest_diverse() {
        // Node 0 at the origin, a tight cluster to the right and one point left.
        static POINTS: [f32; 5] = [0.0, 1.0, 1.1, 1.2, -3.0];
        let mut graph = graph_with(5);
        for n in 1..5 {
            graph.connect(id(0), id(n)).unwrap();
        }

        let changed = graph.prune(id(0), 3, line_distance(&POINTS)).unwrap();

        // 2 and 3 are closer to 1 than to 0, so only 1 and the far point survive.
        assert!(changed);
        assert_eq!(graph.neighbors(id(0)).unwrap(), &[id(1), id(4)]);
    }

    #[test]
    fn test_prune_with_refill() {
        static POINTS: [f32; 5] = [0.0, 1.0, 1.1, 1.2, -3.0];
        let mut graph = graph_with(5);
        for n in 1..5 {
            graph.connect(id(0), id(n)).unwrap();
        }

        graph.prune_with(id(0), 3, true, line_distance(&POINTS)).unwrap();

        assert_eq!(graph.neighbors(id(0)).unwrap(), &[id(1), id(4), id(2)]);
    }

    #[test]
    fn test_prune_bounds_degree() {
        static POINTS: [f32; 6] = [0.0, 1.0, -1.0, 2.0, -2.0, 3.0];
        let mut graph = graph_with(6);
        for n in 1..6 {
            graph.connect(id(0), id(n)).unwrap();
        }

        graph.prune_with(id(0), 2, true, line_distance(&POINTS)).unwrap();
        assert_eq!(graph.degree(id(0)), 2);
    }

    #[test]
    fn test_reverse_adjacency() {
        let mut graph = graph_with(3);
        graph.connect(id(0), id(2)).unwrap();
        graph.connect(id(1), id(2)).unwrap();
        graph.connect(id(2), id(0)).unwrap();

        let reverse = graph.reverse_adjacency();
        assert_eq!(reverse[2], vec![id(0), id(1)]);
        assert_eq!(reverse[0], vec![id(2)]);
        assert!(reverse[1].is_empty());
    }

    #[test]
    fn test_reachability() {
        let mut graph = graph_with(4);
        graph.connect(id(0), id(1)).unwrap();
        graph.connect(id(1), id(2)).unwrap();

        assert_eq!(graph.reachable_from(id(0)), vec![true, true, true, false]);
        assert_eq!(graph.reachable_from(id(2)), vec![false, false, true, false]);
    }

    #[test]
    fn test_candidate_ordering() {
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
        heap.push(Candidate::new(id(1), 1.0));
        heap.push(Candidate::new(id(2), 2.0));
        heap.push(Candidate::new(id(3), 0.5));

        // Min-heap: should pop smallest first
        assert_eq!(heap.pop().unwrap().id, id(3));
        assert_eq!(heap.pop().unwrap().id, id(1));
        assert_eq!(heap.pop().unwrap().id, id(2));
    }

    #[test]
    fn test_candidate_ties_break_by_id() {
        let mut candidates = vec![
            Candidate::new(id(4), 1.0),
            Candidate::new(id(2), 1.0),
            Candidate::new(id(3), 0.0),
        ];
        sort_candidates(&mut candidates);
        let ids: Vec<_> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![id(3), id(2), id(4)]);

        let mut worst: BinaryHeap<MaxCandidate> =
            candidates.into_iter().map(MaxCandidate).collect();
        assert_eq!(worst.pop().unwrap().0.id, id(4));
    }
}
