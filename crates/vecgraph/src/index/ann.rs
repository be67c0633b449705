//! The index facade.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};
use crate::store::VectorStore;
use crate::types::{validate_values, BuildState, VectorId};

use super::builder::{self, BuildReport};
use super::config::IndexConfig;
use super::graph::Graph;
use super::persistence::{self, GraphHeader};
use super::search::{exact_search, greedy_search, Space};
use super::traits::{SearchResult, VectorIndex};

/// Graph-based approximate nearest neighbor index.
///
/// Vectors get dense ids in insertion order. Each [`add`](Self::add) links the
/// new vector into the graph right away so the index is always searchable;
/// [`build`](Self::build) refines the whole graph and fixes the entry point.
///
/// All state sits behind one `RwLock`: searches share it, mutations take it
/// exclusively. The index is `Send + Sync` and is meant to be shared through
/// an `Arc`.
#[derive(Debug)]
pub struct AnnIndex {
    inner: RwLock<IndexInner>,
}

#[derive(Debug)]
struct IndexInner {
    store: VectorStore,
    graph: Graph,
    state: BuildState,
    entry_point: Option<VectorId>,
    config: IndexConfig,
}

impl IndexInner {
    fn new(config: IndexConfig) -> Self {
        Self {
            store: VectorStore::new(),
            graph: Graph::new(),
            state: BuildState::Empty,
            entry_point: None,
            config,
        }
    }

    /// Where inserts and searches start: the built entry point, or the first
    /// node while nothing has been built yet.
    fn seed(&self) -> Option<VectorId> {
        self.entry_point.or_else(|| (!self.graph.is_empty()).then(|| VectorId::new(0)))
    }

    fn space(&self) -> Space<'_> {
        Space::new(&self.store, self.config.metric)
    }

    /// Append an already validated vector and link it.
    fn push(&mut self, vector: &[f32]) -> IndexResult<VectorId> {
        let entry = self.seed();
        self.store.append(vector)?;

        let space = Space::new(&self.store, self.config.metric);
        let id = builder::insert(space, &mut self.graph, &self.config, entry)?;
        self.state = BuildState::Staged;
        Ok(id)
    }

    fn check_query(&self, query: &[f32]) -> IndexResult<()> {
        let Some(dimension) = self.store.dimension().filter(|_| !self.store.is_empty()) else {
            return Err(IndexError::EmptyIndex);
        };
        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch { expected: dimension, actual: query.len() });
        }
        validate_values(query)
    }
}

impl Default for AnnIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnIndex {
    /// Create an empty index with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: RwLock::new(IndexInner::new(IndexConfig::default())) }
    }

    /// Create an empty index with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] if the configuration is rejected.
    pub fn with_config(config: IndexConfig) -> IndexResult<Self> {
        config.validate()?;
        Ok(Self { inner: RwLock::new(IndexInner::new(config)) })
    }

    fn read(&self) -> IndexResult<RwLockReadGuard<'_, IndexInner>> {
        self.inner.read().map_err(|_| IndexError::LockPoisoned)
    }

    fn write(&self) -> IndexResult<RwLockWriteGuard<'_, IndexInner>> {
        self.inner.write().map_err(|_| IndexError::LockPoisoned)
    }

    /// Append a vector and link it into the graph.
    ///
    /// The first vector fixes the index dimension. Adding to a built index
    /// moves it back to [`BuildState::Staged`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`], [`IndexError::InvalidDimension`],
    /// [`IndexError::InvalidValue`] or [`IndexError::CapacityExceeded`]. The
    /// index is unchanged on error.
    pub fn add(&self, vector: &[f32]) -> IndexResult<VectorId> {
        let mut inner = self.write()?;
        inner.store.check(vector)?;
        inner.push(vector)
    }

    /// Append several vectors, all or nothing.
    ///
    /// # Errors
    ///
    /// Every vector is validated first; if any is rejected none are added.
    pub fn add_batch<V: AsRef<[f32]>>(&self, vectors: &[V]) -> IndexResult<Vec<VectorId>> {
        let mut inner = self.write()?;

        let expected =
            inner.store.dimension().or_else(|| vectors.first().map(|v| v.as_ref().len()));
        for vector in vectors {
            let vector = vector.as_ref();
            validate_values(vector)?;
            if let Some(expected) = expected.filter(|&d| d != vector.len()) {
                return Err(IndexError::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        if inner.store.len().saturating_add(vectors.len()) > VectorId::MAX_COUNT {
            return Err(IndexError::CapacityExceeded { max: VectorId::MAX_COUNT });
        }

        vectors.iter().map(|v| inner.push(v.as_ref())).collect()
    }

    /// Refine the graph, choose the entry point and mark the index built.
    ///
    /// Building an empty or already built index does nothing and reports
    /// `skipped`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn build(&self) -> IndexResult<BuildReport> {
        let mut guard = self.write()?;
        let inner = &mut *guard;

        if inner.state != BuildState::Staged {
            return Ok(BuildReport::skipped(inner.entry_point));
        }

        let space = Space::new(&inner.store, inner.config.metric);
        let report = builder::build(space, &mut inner.graph, &inner.config)?;

        inner.entry_point = report.entry_point;
        inner.state = BuildState::Built;

        info!(
            nodes = inner.graph.len(),
            edges = inner.graph.edge_count(),
            rounds = report.rounds,
            metric = inner.config.metric.name(),
            entry_point = ?report.entry_point,
            "index built"
        );
        Ok(report)
    }

    /// Approximate k nearest neighbors using the configured search width.
    ///
    /// # Errors
    ///
    /// - [`IndexError::EmptyIndex`] if no vectors are stored
    /// - [`IndexError::DimensionMismatch`] if the query length differs from
    ///   the index dimension
    /// - [`IndexError::InvalidValue`] if the query has a non-finite component
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchResult>> {
        self.search_inner(query, k, None)
    }

    /// Like [`search`](Self::search) with an explicit search width.
    ///
    /// The width is raised to `k` if smaller.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub fn search_with_width(
        &self,
        query: &[f32],
        k: usize,
        width: usize,
    ) -> IndexResult<Vec<SearchResult>> {
        self.search_inner(query, k, Some(width))
    }

    /// Like [`search`](Self::search) but returns ids only.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub fn search_ids(&self, query: &[f32], k: usize) -> IndexResult<Vec<VectorId>> {
        Ok(self.search(query, k)?.into_iter().map(|r| r.id).collect())
    }

    fn search_inner(
        &self,
        query: &[f32],
        k: usize,
        width: Option<usize>,
    ) -> IndexResult<Vec<SearchResult>> {
        let inner = self.read()?;
        inner.check_query(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let width = width.unwrap_or(inner.config.ef_search).max(k);
        let seed: Vec<VectorId> = inner.seed().into_iter().collect();
        let max_visits = inner.config.max_visits;
        let mut found = greedy_search(inner.space(), &inner.graph, query, &seed, width, max_visits);
        found.truncate(k);

        Ok(found.into_iter().map(|c| SearchResult::new(c.id, c.distance)).collect())
    }

    /// Exact k nearest neighbors by scanning every stored vector.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub fn exact_search(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchResult>> {
        let inner = self.read()?;
        inner.check_query(query)?;

        Ok(exact_search(inner.space(), query, k)
            .into_iter()
            .map(|c| SearchResult::new(c.id, c.distance))
            .collect())
    }

    /// A copy of the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `id` is unknown.
    pub fn get(&self, id: VectorId) -> IndexResult<Vec<f32>> {
        Ok(self.read()?.store.get(id)?.to_vec())
    }

    /// A copy of the adjacency list of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::OutOfRange`] if `id` is unknown.
    pub fn neighbors(&self, id: VectorId) -> IndexResult<Vec<VectorId>> {
        Ok(self.read()?.graph.neighbors(id)?.to_vec())
    }

    /// Number of stored vectors.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn len(&self) -> IndexResult<usize> {
        Ok(self.read()?.store.len())
    }

    /// Whether the index holds no vectors.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn is_empty(&self) -> IndexResult<bool> {
        Ok(self.read()?.store.is_empty())
    }

    /// The dimension fixed by the first vector, `None` while empty.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn dimension(&self) -> IndexResult<Option<usize>> {
        Ok(self.read()?.store.dimension())
    }

    /// Current build state.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn state(&self) -> IndexResult<BuildState> {
        Ok(self.read()?.state)
    }

    /// The entry point chosen by the last build, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn entry_point(&self) -> IndexResult<Option<VectorId>> {
        Ok(self.read()?.entry_point)
    }

    /// The index configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the lock is poisoned.
    pub fn config(&self) -> IndexResult<IndexConfig> {
        Ok(self.read()?.config.clone())
    }

    /// Serialize the index as `(elements, graph)` byte streams.
    ///
    /// A staged index can be saved; it loads as built with the same graph.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Encoding`] if the header cannot be encoded.
    pub fn save(&self) -> IndexResult<(Vec<u8>, Vec<u8>)> {
        let inner = self.read()?;

        let dimension = inner.store.dimension().unwrap_or(0);
        let header = GraphHeader {
            dimension: u32::try_from(dimension)
                .map_err(|_| IndexError::Encoding(format!("dimension {dimension} exceeds u32")))?,
            node_count: inner.graph.len() as u64,
            entry_point: inner.seed().map(VectorId::as_u32),
            config: inner.config.clone(),
        };

        let elements = persistence::encode_elements(&inner.store)?;
        let graph = persistence::encode_graph(&inner.graph, &header)?;
        Ok((elements, graph))
    }

    /// Reconstruct an index from streams produced by [`save`](Self::save).
    ///
    /// The loaded index is [`BuildState::Built`], or [`BuildState::Empty`]
    /// if it holds no vectors, and uses the configuration stored in the graph
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CorruptData`] if either stream fails validation.
    pub fn load(elements: &[u8], graph: &[u8]) -> IndexResult<Self> {
        Ok(Self { inner: RwLock::new(decode(elements, graph)?) })
    }

    /// Replace this index's contents with the decoded streams.
    ///
    /// Both streams are fully validated before anything is replaced, so on
    /// error the index is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CorruptData`] if either stream fails validation.
    pub fn replace_from(&self, elements: &[u8], graph: &[u8]) -> IndexResult<()> {
        let decoded = decode(elements, graph)?;
        *self.write()? = decoded;
        Ok(())
    }
}

fn decode(elements: &[u8], graph: &[u8]) -> IndexResult<IndexInner> {
    let store = persistence::decode_elements(elements)?;
    let (graph, header) = persistence::decode_graph(graph, &store)?;

    let state = if store.is_empty() { BuildState::Empty } else { BuildState::Built };
    debug!(nodes = store.len(), dimension = header.dimension, %state, "index loaded");

    Ok(IndexInner {
        store,
        graph,
        state,
        entry_point: header.entry_point.map(VectorId::new),
        config: header.config,
    })
}

impl VectorIndex for AnnIndex {
    fn add(&self, vector: &[f32]) -> IndexResult<VectorId> {
        Self::add(self, vector)
    }

    fn add_batch(&self, vectors: &[&[f32]]) -> IndexResult<Vec<VectorId>> {
        Self::add_batch(self, vectors)
    }

    fn build(&self) -> IndexResult<BuildReport> {
        Self::build(self)
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        width: Option<usize>,
    ) -> IndexResult<Vec<SearchResult>> {
        self.search_inner(query, k, width)
    }

    fn len(&self) -> IndexResult<usize> {
        Self::len(self)
    }

    fn dimension(&self) -> IndexResult<Option<usize>> {
        Self::dimension(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;

    fn square() -> AnnIndex {
        let index = AnnIndex::new();
        for v in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [10.0, 10.0]] {
            index.add(&v).unwrap();
        }
        index
    }

    #[test]
    fn test_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnnIndex>();
    }

    #[test]
    fn test_create_index() {
        let index = AnnIndex::new();
        assert_eq!(index.len().unwrap(), 0);
        assert!(index.is_empty().unwrap());
        assert_eq!(index.dimension().unwrap(), None);
        assert_eq!(index.state().unwrap(), BuildState::Empty);
    }

    #[test]
    fn test_invalid_config() {
        let result = AnnIndex::with_config(IndexConfig::new(8).with_ef_search(0));
        assert!(matches!(result, Err(IndexError::InvalidConfig(_))));
    }

    #[test]
    fn test_ids_are_sequential() {
        let index = AnnIndex::new();
        for i in 0..5u32 {
            assert_eq!(index.add(&[i as f32, 1.0]).unwrap(), VectorId::new(i));
        }
        assert_eq!(index.get(VectorId::new(3)).unwrap(), vec![3.0, 1.0]);
        assert_eq!(index.dimension().unwrap(), Some(2));
    }

    #[test]
    fn test_state_transitions() {
        let index = square();
        assert_eq!(index.state().unwrap(), BuildState::Staged);

        let report = index.build().unwrap();
        assert!(!report.skipped);
        assert_eq!(index.state().unwrap(), BuildState::Built);
        assert!(index.entry_point().unwrap().is_some());

        index.add(&[2.0, 2.0]).unwrap();
        assert_eq!(index.state().unwrap(), BuildState::Staged);
    }

    #[test]
    fn test_build_empty_is_noop() {
        let index = AnnIndex::new();
        let report = index.build().unwrap();
        assert!(report.skipped);
        assert_eq!(index.state().unwrap(), BuildState::Empty);
    }

    #[test]
    fn test_build_twice_is_noop() {
        let index = square();
        index.build().unwrap();
        let before: Vec<_> =
            (0..4).map(|i| index.neighbors(VectorId::new(i)).unwrap()).collect();

        let report = index.build().unwrap();
        assert!(report.skipped);
        let after: Vec<_> = (0..4).map(|i| index.neighbors(VectorId::new(i)).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_search_nearest() {
        let index = square();
        index.build().unwrap();

        let results = index.search(&[0.1, 0.1], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, VectorId::new(0));
        assert!(results.iter().all(|r| r.id != VectorId::new(3)));
        assert!(results[0].distance <= results[1].distance);
    }

    #[test]
    fn test_search_staged_does_not_fail() {
        let index = square();
        let ids = index.search_ids(&[9.0, 9.0], 1).unwrap();
        assert_eq!(ids, vec![VectorId::new(3)]);
    }

    #[test]
    fn test_search_errors() {
        let index = AnnIndex::new();
        assert!(matches!(index.search(&[0.0, 0.0], 1), Err(IndexError::EmptyIndex)));

        let index = square();
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(index.search(&[f32::NAN, 0.0], 1), Err(IndexError::InvalidValue { .. })));
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = square();
        index.build().unwrap();
        let results = index.search_with_width(&[0.0, 0.0], 10, 1).unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_add_dimension_mismatch_leaves_index_unchanged() {
        let index = square();
        let result = index.add(&[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { expected: 2, actual: 3 })));
        assert_eq!(index.len().unwrap(), 4);
    }

    #[test]
    fn test_add_batch_all_or_nothing() {
        let index = AnnIndex::new();
        let ids = index.add_batch(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!(ids, vec![VectorId::new(0), VectorId::new(1)]);

        let bad = index.add_batch(&[vec![2.0, 2.0], vec![f32::INFINITY, 0.0]]);
        assert!(matches!(bad, Err(IndexError::InvalidValue { .. })));
        let bad = index.add_batch(&[vec![2.0, 2.0], vec![1.0]]);
        assert!(matches!(bad, Err(IndexError::DimensionMismatch { .. })));
        assert_eq!(index.len().unwrap(), 2);

        let empty: [Vec<f32>; 0] = [];
        assert!(index.add_batch(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_trait_add_batch_all_or_nothing() {
        let index = square();
        let batch: [&[f32]; 2] = [&[2.0, 2.0], &[1.0]];
        let bad = VectorIndex::add_batch(&index, &batch);
        assert!(matches!(bad, Err(IndexError::DimensionMismatch { .. })));
        assert_eq!(VectorIndex::len(&index).unwrap(), 4);

        let batch: [&[f32]; 2] = [&[2.0, 2.0], &[3.0, 3.0]];
        let ids = VectorIndex::add_batch(&index, &batch).unwrap();
        assert_eq!(ids, vec![VectorId::new(4), VectorId::new(5)]);
    }

    #[test]
    fn test_get_out_of_range() {
        let index = square();
        assert!(matches!(
            index.get(VectorId::new(4)),
            Err(IndexError::OutOfRange { id: 4, len: 4 })
        ));
        assert!(matches!(index.neighbors(VectorId::new(9)), Err(IndexError::OutOfRange { .. })));
    }

    #[test]
    fn test_exact_search() {
        let index = square();
        let results = index.exact_search(&[9.0, 9.0], 2).unwrap();
        assert_eq!(results[0].id, VectorId::new(3));
        assert_eq!(results[0].distance, 2.0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let index = AnnIndex::with_config(IndexConfig::new(4).with_metric(DistanceMetric::Cosine))
            .unwrap();
        for i in 0..20u32 {
            index.add(&[(i as f32).cos(), (i as f32).sin(), 1.0]).unwrap();
        }
        index.build().unwrap();

        let (elements, graph) = index.save().unwrap();
        let loaded = AnnIndex::load(&elements, &graph).unwrap();

        assert_eq!(loaded.len().unwrap(), 20);
        assert_eq!(loaded.state().unwrap(), BuildState::Built);
        assert_eq!(loaded.entry_point().unwrap(), index.entry_point().unwrap());
        assert_eq!(loaded.config().unwrap(), index.config().unwrap());
        for i in 0..20 {
            let id = VectorId::new(i);
            assert_eq!(loaded.get(id).unwrap(), index.get(id).unwrap());
            assert_eq!(loaded.neighbors(id).unwrap(), index.neighbors(id).unwrap());
        }

        let query = [0.3, 0.9, 1.0];
        assert_eq!(loaded.search(&query, 5).unwrap(), index.search(&query, 5).unwrap());
    }

    #[test]
    fn test_save_staged_and_empty() {
        let (elements, graph) = square().save().unwrap();
        let loaded = AnnIndex::load(&elements, &graph).unwrap();
        assert_eq!(loaded.state().unwrap(), BuildState::Built);

        let (elements, graph) = AnnIndex::new().save().unwrap();
        let loaded = AnnIndex::load(&elements, &graph).unwrap();
        assert_eq!(loaded.state().unwrap(), BuildState::Empty);
        assert!(matches!(loaded.search(&[0.0], 1), Err(IndexError::EmptyIndex)));
    }

    #[test]
    fn test_replace_from_keeps_state_on_error() {
        let index = square();
        assert!(index.replace_from(b"junk", b"junk").is_err());
        assert_eq!(index.len().unwrap(), 4);

        let other = AnnIndex::new();
        other.add(&[5.0]).unwrap();
        let (elements, graph) = other.save().unwrap();
        index.replace_from(&elements, &graph).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        assert_eq!(index.dimension().unwrap(), Some(1));
    }

    #[test]
    fn test_trait_object_usage() {
        let index = square();
        let dyn_index: &dyn VectorIndex = &index;
        assert_eq!(dyn_index.len().unwrap(), 4);
        assert!(!dyn_index.is_empty().unwrap());
        let results = dyn_index.search(&[0.0, 0.0], 1, Some(16)).unwrap();
        assert_eq!(results[0].id, VectorId::new(0));
    }
}
