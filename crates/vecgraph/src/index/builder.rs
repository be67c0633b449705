//! Graph construction.
//!
//! Construction has two phases:
//!
//! - [`insert`] links each new vector as it arrives: a greedy search over the
//!   current graph finds its neighbors, the new node takes a diverse subset,
//!   and each chosen neighbor gets the reverse edge (pruned if over degree).
//!   The graph is searchable at every step, with recall depending on the
//!   insertion order.
//! - [`build`] runs neighbor descent over the whole graph, picks the entry
//!   point, and reattaches any node the entry point cannot reach.

use tracing::{debug, warn};

use crate::error::IndexResult;
use crate::types::VectorId;

use super::config::{EntryPointPolicy, IndexConfig};
use super::graph::{select_neighbors, sort_candidates, Candidate, Graph};
use super::search::{exact_search, greedy_search, Space};

/// Outcome of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// `true` when the index was empty or already built and nothing ran.
    pub skipped: bool,
    /// Refinement rounds executed.
    pub rounds: usize,
    /// Adjacency slots replaced across all rounds.
    pub changed_edges: usize,
    /// Nodes reattached by the reachability repair.
    pub attached: usize,
    /// Nodes still unreachable from the entry point after repair.
    pub unreachable: usize,
    /// Entry point chosen by the build.
    pub entry_point: Option<VectorId>,
}

impl BuildReport {
    /// A report for a build that had nothing to do.
    #[must_use]
    pub fn skipped(entry_point: Option<VectorId>) -> Self {
        Self { skipped: true, entry_point, ..Self::default() }
    }
}

/// Link the most recently appended vector into the graph.
///
/// The vector must already be in the store; its graph node is created here.
/// `entry` seeds the neighbor search and is `None` only for the first node.
pub(crate) fn insert(
    space: Space<'_>,
    graph: &mut Graph,
    config: &IndexConfig,
    entry: Option<VectorId>,
) -> IndexResult<VectorId> {
    let id = graph.add_node();
    debug_assert_eq!(graph.len(), space.store().len(), "graph and store out of step");

    let Some(entry) = entry.filter(|&e| e != id) else {
        return Ok(id);
    };

    let query = space.store().vector(id);
    let candidates = greedy_search(space, graph, query, &[entry], config.ef_construction, 0);
    let neighbors = select_neighbors(&candidates, config.max_degree, config.keep_pruned, |a, b| {
        space.distance(a, b)
    });

    graph.set_neighbors(id, neighbors.clone());
    for neighbor in neighbors {
        link_back(space, graph, config, neighbor, id)?;
    }

    Ok(id)
}

/// Add `from -> to`, pruning `from` if that pushes it over the degree bound.
fn link_back(
    space: Space<'_>,
    graph: &mut Graph,
    config: &IndexConfig,
    from: VectorId,
    to: VectorId,
) -> IndexResult<()> {
    if graph.connect(from, to)? && graph.degree(from) > config.max_degree {
        graph.prune_with(from, config.max_degree, config.keep_pruned, |a, b| space.distance(a, b))?;
    }
    Ok(())
}

/// Refine the graph, choose the entry point, and repair reachability.
pub(crate) fn build(
    space: Space<'_>,
    graph: &mut Graph,
    config: &IndexConfig,
) -> IndexResult<BuildReport> {
    let mut report = refine(space, graph, config)?;

    let Some(entry) = select_entry_point(space, graph, config.entry_point) else {
        return Ok(report);
    };
    report.entry_point = Some(entry);

    let (attached, unreachable) = repair_reachability(space, graph, config, entry)?;
    report.attached = attached;
    report.unreachable = unreachable;

    Ok(report)
}

/// Neighbor descent.
///
/// Each round visits every node in id order and re-selects its adjacency
/// from its neighbors, its neighbors' neighbors and (optionally) the nodes
/// pointing at it, keeping the closest `max(ef_construction, max_degree)`
/// before diversification. Selected neighbors get the reverse edge.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn refine(
    space: Space<'_>,
    graph: &mut Graph,
    config: &IndexConfig,
) -> IndexResult<BuildReport> {
    let n = graph.len();
    let pool_limit = config.ef_construction.max(config.max_degree);
    let mut report = BuildReport::default();

    let mut in_pool = vec![false; n];
    let mut pool: Vec<VectorId> = Vec::new();

    for round in 0..config.refine.max_rounds {
        let reverse =
            if config.refine.include_reverse { graph.reverse_adjacency() } else { Vec::new() };
        let mut changed = 0usize;

        for index in 0..n {
            let node = VectorId::new(index as u32);

            pool.clear();
            in_pool[index] = true;
            let mut gather = |id: VectorId, pool: &mut Vec<VectorId>| {
                if !in_pool[id.index()] {
                    in_pool[id.index()] = true;
                    pool.push(id);
                }
            };
            for &neighbor in graph.neighbors_of(node) {
                gather(neighbor, &mut pool);
                for &second in graph.neighbors_of(neighbor) {
                    gather(second, &mut pool);
                }
            }
            if let Some(incoming) = reverse.get(index) {
                for &r in incoming {
                    gather(r, &mut pool);
                }
            }
            in_pool[index] = false;
            for id in &pool {
                in_pool[id.index()] = false;
            }

            let mut candidates: Vec<Candidate> =
                pool.iter().map(|&id| Candidate::new(id, space.distance(node, id))).collect();
            sort_candidates(&mut candidates);
            candidates.truncate(pool_limit);

            let selected =
                select_neighbors(&candidates, config.max_degree, config.keep_pruned, |a, b| {
                    space.distance(a, b)
                });

            let previous = graph.neighbors_of(node);
            changed += selected.iter().filter(|id| !previous.contains(*id)).count();
            graph.set_neighbors(node, selected.clone());

            for neighbor in selected {
                link_back(space, graph, config, neighbor, node)?;
            }
        }

        report.rounds = round + 1;
        report.changed_edges += changed;

        let churn = changed as f64 / graph.edge_count().max(1) as f64;
        debug!(round = round + 1, changed, churn, "refinement round complete");
        if churn < config.refine.min_churn {
            break;
        }
    }

    Ok(report)
}

/// Pick the node every search starts from.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn select_entry_point(
    space: Space<'_>,
    graph: &Graph,
    policy: EntryPointPolicy,
) -> Option<VectorId> {
    let store = space.store();
    if store.is_empty() {
        return None;
    }

    match policy {
        EntryPointPolicy::First => Some(VectorId::new(0)),
        EntryPointPolicy::HighestDegree => {
            let mut best = VectorId::new(0);
            for index in 1..graph.len() {
                let id = VectorId::new(index as u32);
                if graph.degree(id) > graph.degree(best) {
                    best = id;
                }
            }
            Some(best)
        }
        EntryPointPolicy::Medoid => {
            let dimension = store.dimension()?;
            let mut sum = vec![0.0_f64; dimension];
            for (_, vector) in store.iter() {
                for (acc, &x) in sum.iter_mut().zip(vector) {
                    *acc += f64::from(x);
                }
            }
            let count = store.len() as f64;
            let centroid: Vec<f32> = sum.into_iter().map(|s| (s / count) as f32).collect();
            exact_search(space, &centroid, 1).first().map(|c| c.id)
        }
    }
}

const REPAIR_PASSES: usize = 4;

/// Attach nodes the entry point cannot reach.
///
/// Each orphan gets an edge from the nearest reachable node that still has
/// a free adjacency slot. If none of the nodes found has room, the nearest
/// one drops its farthest neighbor instead, which may orphan that neighbor;
/// later passes pick those up. Returns `(attached, still_unreachable)`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn repair_reachability(
    space: Space<'_>,
    graph: &mut Graph,
    config: &IndexConfig,
    entry: VectorId,
) -> IndexResult<(usize, usize)> {
    let mut attached = 0usize;

    for _pass in 0..REPAIR_PASSES {
        let mut reachable = graph.reachable_from(entry);
        let orphans: Vec<VectorId> = reachable
            .iter()
            .enumerate()
            .filter(|&(_, &seen)| !seen)
            .map(|(index, _)| VectorId::new(index as u32))
            .collect();
        if orphans.is_empty() {
            break;
        }

        for orphan in orphans {
            if reachable[orphan.index()] {
                continue;
            }

            let query = space.store().vector(orphan);
            let found = greedy_search(space, graph, query, &[entry], config.ef_construction, 0);
            let target = found
                .iter()
                .find(|c| reachable[c.id.index()] && graph.degree(c.id) < config.max_degree)
                .or_else(|| found.first())
                .map(|c| c.id);
            let Some(target) = target else {
                continue;
            };

            if graph.degree(target) >= config.max_degree {
                let farthest = graph.neighbors_of(target).iter().copied().max_by(|&a, &b| {
                    space.distance(target, a).total_cmp(&space.distance(target, b))
                });
                if let Some(farthest) = farthest {
                    graph.disconnect(target, farthest);
                }
            }

            graph.connect(target, orphan)?;
            attached += 1;
            graph.mark_reachable(orphan, &mut reachable);
        }
    }

    let unreachable = graph.reachable_from(entry).iter().filter(|&&seen| !seen).count();
    if unreachable > 0 {
        warn!(unreachable, entry = %entry, "nodes remain unreachable after repair");
    }

    Ok((attached, unreachable))
}
