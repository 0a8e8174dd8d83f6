//! Named vector stores with get-or-create semantics.
//!
//! A [`CollectionManager`] owns the set of stores of one process (for the movie
//! recommender: one store of titles, one of full descriptions) but not their
//! contents. Every store it creates shares the manager's embedder.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::embedding::executor::SharedEmbedder;
use crate::error::{MarqueeError, Result};
use crate::storage::Storage;
use crate::vector::core::record::ItemId;
use crate::vector::store::{VectorStore, VectorStoreConfig, validate_collection_name};
use crate::vector::wal::WAL_SUFFIX;

/// Namespace of vector stores keyed by name.
pub struct CollectionManager {
    storage: Option<Arc<dyn Storage>>,
    embedder: Option<SharedEmbedder>,
    /// Settings for new stores; the name is replaced per collection.
    template: VectorStoreConfig,
    stores: RwLock<AHashMap<String, Arc<VectorStore>>>,
}

impl std::fmt::Debug for CollectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionManager")
            .field("storage", &self.storage)
            .field("embedder", &self.embedder)
            .field("template", &self.template)
            .field("open", &self.stores.read().len())
            .finish()
    }
}

impl CollectionManager {
    /// A manager whose stores live only in memory.
    pub fn in_memory(embedder: Option<SharedEmbedder>, template: VectorStoreConfig) -> Self {
        Self {
            storage: None,
            embedder,
            template,
            stores: RwLock::new(AHashMap::new()),
        }
    }

    /// A manager whose stores are persisted in `storage`.
    pub fn open(
        storage: Arc<dyn Storage>,
        embedder: Option<SharedEmbedder>,
        template: VectorStoreConfig,
    ) -> Self {
        Self {
            storage: Some(storage),
            embedder,
            template,
            stores: RwLock::new(AHashMap::new()),
        }
    }

    /// The shared embedder, if any.
    pub fn embedder(&self) -> Option<&SharedEmbedder> {
        self.embedder.as_ref()
    }

    /// Whether stores are persisted.
    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Return the store called `name`, creating (or reopening) it if needed.
    ///
    /// Repeated calls with the same name return the same store.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<VectorStore>> {
        validate_collection_name(name)?;

        if let Some(store) = self.stores.read().get(name) {
            return Ok(Arc::clone(store));
        }

        let mut stores = self.stores.write();
        // Another thread may have created it between the two locks.
        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(self.create_store(name)?);
        stores.insert(name.to_string(), Arc::clone(&store));
        log::debug!("created collection handle '{name}'");
        Ok(store)
    }

    /// Return an existing store. Persisted but unopened stores are opened.
    pub fn get(&self, name: &str) -> Result<Arc<VectorStore>> {
        if self.contains(name) {
            self.get_or_create(name)
        } else {
            Err(MarqueeError::not_found(format!("collection '{name}'")))
        }
    }

    /// Whether a store called `name` exists, opened or persisted.
    pub fn contains(&self, name: &str) -> bool {
        if self.stores.read().contains_key(name) {
            return true;
        }
        match &self.storage {
            Some(storage) => {
                validate_collection_name(name).is_ok()
                    && storage.file_exists(&format!("{name}{WAL_SUFFIX}"))
            }
            None => false,
        }
    }

    /// Sorted names of all stores, including persisted ones not yet opened.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.stores.read().keys().cloned().collect();
        if let Some(storage) = &self.storage {
            for file in storage.list_files()? {
                if let Some(name) = file.strip_suffix(WAL_SUFFIX) {
                    if validate_collection_name(name).is_ok() {
                        names.insert(name.to_string());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Bulk-insert texts into `store` only when it is empty.
    ///
    /// Re-running a population against an already populated store is a no-op.
    /// Returns whether anything was inserted.
    pub fn populate_if_empty<I: Into<ItemId>>(
        &self,
        store: &VectorStore,
        ids: Vec<I>,
        texts: Vec<String>,
        documents: Option<Vec<String>>,
    ) -> Result<bool> {
        let batch = ids.len();
        let populated = store.insert_texts_if_empty(ids, texts, documents)?;
        if populated {
            log::info!("populated collection '{}' with {batch} items", store.name());
        } else {
            log::info!(
                "collection '{}' already holds {} items, skipping population",
                store.name(),
                store.count()
            );
        }
        Ok(populated)
    }

    fn create_store(&self, name: &str) -> Result<VectorStore> {
        let config = self.template.named(name);
        match &self.storage {
            Some(storage) => VectorStore::open(config, Arc::clone(storage), self.embedder.clone()),
            None => VectorStore::in_memory(config, self.embedder.clone()),
        }
    }
}
