//! The index registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use vecgraph::{AnnIndex, BuildReport, IndexConfig, SearchResult, VectorId};

use crate::error::{RegistryError, RegistryResult};

/// Name-addressable collection of indexes.
///
/// Indexes are held as `Arc<AnnIndex>`. The map lock is only held long
/// enough to look a name up, so long operations on one index (a build, a
/// large batch) never block calls on other names. Calls on the same name
/// are serialized by the index's own lock.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    /// Loaded indexes by name.
    indexes: RwLock<HashMap<String, Arc<AnnIndex>>>,
    /// Configuration used by [`create`](Self::create).
    default_config: IndexConfig,
}

impl IndexRegistry {
    /// Create an empty registry whose indexes use the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with a custom default index configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Index`] if the configuration is invalid.
    pub fn with_default_config(config: IndexConfig) -> RegistryResult<Self> {
        config.validate()?;
        Ok(Self { indexes: RwLock::new(HashMap::new()), default_config: config })
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, HashMap<String, Arc<AnnIndex>>>> {
        self.indexes.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> RegistryResult<RwLockWriteGuard<'_, HashMap<String, Arc<AnnIndex>>>> {
        self.indexes.write().map_err(|_| RegistryError::LockPoisoned)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create an empty index under `name`, replacing any index already there.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn create(&self, name: &str) -> RegistryResult<Arc<AnnIndex>> {
        self.create_with_config(name, self.default_config.clone())
    }

    /// Create an empty index under `name` with its own configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Index`] if the configuration is invalid.
    pub fn create_with_config(
        &self,
        name: &str,
        config: IndexConfig,
    ) -> RegistryResult<Arc<AnnIndex>> {
        let index = AnnIndex::with_config(config)?;
        self.insert(name, index)
    }

    /// Register an existing index under `name`, replacing any index already
    /// there.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn insert(&self, name: &str, index: AnnIndex) -> RegistryResult<Arc<AnnIndex>> {
        let index = Arc::new(index);
        let replaced = self.write()?.insert(name.to_string(), Arc::clone(&index)).is_some();
        debug!(name, replaced, "index registered");
        Ok(index)
    }

    /// Look up the index registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no index has that name.
    pub fn get(&self, name: &str) -> RegistryResult<Arc<AnnIndex>> {
        self.read()?.get(name).cloned().ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Remove the index registered under `name`.
    ///
    /// Handles obtained through [`get`](Self::get) stay usable.
    ///
    /// # Returns
    ///
    /// `true` if an index was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn drop(&self, name: &str) -> RegistryResult<bool> {
        let removed = self.write()?.remove(name).is_some();
        debug!(name, removed, "index dropped");
        Ok(removed)
    }

    /// Whether an index is registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn contains(&self, name: &str) -> RegistryResult<bool> {
        Ok(self.read()?.contains_key(name))
    }

    /// Registered names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn names(&self) -> RegistryResult<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Number of registered indexes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn len(&self) -> RegistryResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether no index is registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the registry lock is poisoned.
    pub fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.read()?.is_empty())
    }

    // ========================================================================
    // Index operations by name
    // ========================================================================

    /// Append a vector to the named index and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name, or the index
    /// error if the vector is rejected.
    pub fn add(&self, name: &str, vector: &[f32]) -> RegistryResult<VectorId> {
        Ok(self.get(name)?.add(vector)?)
    }

    /// Append several vectors to the named index, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name, or the index
    /// error if any vector is rejected.
    pub fn add_batch<V: AsRef<[f32]>>(
        &self,
        name: &str,
        vectors: &[V],
    ) -> RegistryResult<Vec<VectorId>> {
        Ok(self.get(name)?.add_batch(vectors)?)
    }

    /// Build the named index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name.
    pub fn build(&self, name: &str) -> RegistryResult<BuildReport> {
        Ok(self.get(name)?.build()?)
    }

    /// Search the named index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name, or the index
    /// error for an empty index or malformed query.
    pub fn search(&self, name: &str, query: &[f32], k: usize) -> RegistryResult<Vec<SearchResult>> {
        Ok(self.get(name)?.search(query, k)?)
    }

    /// Serialize the named index as `(elements, graph)` byte streams.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name.
    pub fn save(&self, name: &str) -> RegistryResult<(Vec<u8>, Vec<u8>)> {
        Ok(self.get(name)?.save()?)
    }

    /// Decode an index and register it under `name`, replacing any index
    /// already there.
    ///
    /// Nothing is replaced if decoding fails.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Index`] wrapping
    /// [`IndexError::CorruptData`](vecgraph::IndexError::CorruptData) if
    /// either stream is invalid.
    pub fn load(&self, name: &str, elements: &[u8], graph: &[u8]) -> RegistryResult<Arc<AnnIndex>> {
        let index = AnnIndex::load(elements, graph)?;
        debug!(name, vectors = index.len()?, "index loaded into registry");
        self.insert(name, index)
    }
}
