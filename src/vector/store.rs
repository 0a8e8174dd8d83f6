//! The vector store: `(id, embedding, document)` records with exact k-NN query.
//!
//! A [`VectorStore`] is one named collection. All embeddings in a store share
//! one dimension `D`, fixed either by configuration or by the first insert.
//! Writers take an exclusive lock for the whole batch and readers share the
//! lock, so a query never observes a half-applied record.
//!
//! # Example
//!
//! ```
//! use marquee::vector::core::embedding::Embedding;
//! use marquee::vector::search::Include;
//! use marquee::vector::store::{VectorStore, VectorStoreConfig};
//!
//! # fn main() -> marquee::error::Result<()> {
//! let store = VectorStore::in_memory(VectorStoreConfig::new("points"), None)?;
//! store.insert(
//!     vec![1u64, 2, 3],
//!     vec![
//!         Embedding::from([0.0, 0.0]),
//!         Embedding::from([1.0, 0.0]),
//!         Embedding::from([5.0, 5.0]),
//!     ],
//!     None,
//! )?;
//!
//! let results = store.query(&[Embedding::from([0.0, 0.0])], 2, Include::default())?;
//! assert_eq!(results[0].hits[0].id.as_str(), "1");
//! assert_eq!(results[0].hits[1].distance, Some(1.0));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::embedding::executor::SharedEmbedder;
use crate::error::{MarqueeError, Result};
use crate::storage::Storage;
use crate::vector::core::distance::DistanceMetric;
use crate::vector::core::embedding::Embedding;
use crate::vector::core::record::{ItemId, Record};
use crate::vector::search::{Deadline, Include, QueryHit, QueryResult, exact_knn};
use crate::vector::wal::{WalEntry, WalManager};

/// What happens when an inserted id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the whole batch with [`MarqueeError::DuplicateId`].
    #[default]
    Reject,
    /// Replace the stored embedding and document in place. The record keeps
    /// its original insertion position for tie-breaking.
    Overwrite,
}

/// Configuration for a single vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Collection name; also the record log's file stem.
    pub name: String,
    /// Fixed dimension. `None` lets the first insert establish it.
    pub dimension: Option<usize>,
    /// Distance metric used for ranking.
    pub metric: DistanceMetric,
    /// Policy for inserts of existing ids.
    pub duplicate_policy: DuplicatePolicy,
    /// Scans of at least this many vectors compute distances in parallel.
    pub parallel_threshold: usize,
    /// Optional deadline for a single insert or query call, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            dimension: None,
            metric: DistanceMetric::SquaredEuclidean,
            duplicate_policy: DuplicatePolicy::Reject,
            parallel_threshold: 1024,
            timeout_ms: None,
        }
    }
}

impl VectorStoreConfig {
    /// Default configuration for a store called `name`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Same settings under another name.
    pub fn named<S: Into<String>>(&self, name: S) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The configured timeout as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_collection_name(&self.name)?;
        if self.dimension == Some(0) {
            return Err(MarqueeError::invalid_config(
                "store dimension must be positive",
            ));
        }
        if self.parallel_threshold == 0 {
            return Err(MarqueeError::invalid_config(
                "parallel_threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Check that `name` can be used as a collection (and file) name.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if name.is_empty() || name.len() > 128 || !valid_chars || name.starts_with('.') {
        return Err(MarqueeError::invalid_argument(format!(
            "invalid collection name '{name}': use 1-128 characters from [A-Za-z0-9_.-], not starting with '.'"
        )));
    }
    Ok(())
}

/// Statistics for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreStats {
    pub name: String,
    pub count: usize,
    pub dimension: Option<usize>,
    pub metric: DistanceMetric,
    pub persistent: bool,
    pub log_seq: Option<u64>,
}

#[derive(Debug, Default)]
struct StoreState {
    dimension: Option<usize>,
    /// Records in insertion order; the index is the tie-break position.
    records: Vec<Record>,
    positions: AHashMap<ItemId, usize>,
}

impl StoreState {
    fn apply(&mut self, record: Record) {
        match self.positions.get(&record.id) {
            Some(&position) => self.records[position] = record,
            None => {
                self.positions.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

/// A named collection of embeddings supporting insert and k-NN query.
pub struct VectorStore {
    config: VectorStoreConfig,
    state: RwLock<StoreState>,
    embedder: Option<SharedEmbedder>,
    wal: Option<WalManager>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VectorStore")
            .field("config", &self.config)
            .field("count", &state.records.len())
            .field("dimension", &state.dimension)
            .field("embedder", &self.embedder)
            .field("persistent", &self.wal.is_some())
            .finish()
    }
}

impl VectorStore {
    /// Create a store that lives only in memory.
    pub fn in_memory(config: VectorStoreConfig, embedder: Option<SharedEmbedder>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(StoreState {
                dimension: config.dimension,
                ..Default::default()
            }),
            config,
            embedder,
            wal: None,
        })
    }

    /// Open (or create) a store persisted in `storage`, replaying its log.
    pub fn open(
        config: VectorStoreConfig,
        storage: Arc<dyn Storage>,
        embedder: Option<SharedEmbedder>,
    ) -> Result<Self> {
        config.validate()?;
        let wal = WalManager::new(storage, &config.name);
        let replay = wal.replay()?;

        let mut state = StoreState {
            dimension: config.dimension,
            ..Default::default()
        };
        for record in replay.records {
            match record.entry {
                WalEntry::Schema { dimension, metric } => {
                    if metric != config.metric {
                        return Err(MarqueeError::invalid_config(format!(
                            "collection '{}' was created with metric '{metric}', not '{}'",
                            config.name, config.metric
                        )));
                    }
                    if let Some(expected) = config.dimension {
                        if expected != dimension {
                            return Err(MarqueeError::dimension_mismatch(expected, dimension));
                        }
                    }
                    state.dimension = Some(dimension);
                }
                WalEntry::Put {
                    id,
                    embedding,
                    document,
                } => {
                    let expected = state.dimension.ok_or_else(|| {
                        MarqueeError::corruption(format!(
                            "collection '{}' has a record before its schema",
                            config.name
                        ))
                    })?;
                    if embedding.len() != expected {
                        return Err(MarqueeError::corruption(format!(
                            "record '{id}' in '{}' has dimension {}, expected {expected}",
                            config.name,
                            embedding.len()
                        )));
                    }
                    state.apply(Record {
                        id,
                        embedding: Embedding::new(embedding),
                        document,
                    });
                }
            }
        }

        log::info!(
            "opened collection '{}' with {} records from {}",
            config.name,
            state.records.len(),
            wal.path()
        );

        Ok(Self {
            config,
            state: RwLock::new(state),
            embedder,
            wal: Some(wal),
        })
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The store's configuration.
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// The distance metric used for ranking.
    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// The established dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().dimension
    }

    /// Number of stored items.
    pub fn count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether an item with `id` is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.state.read().positions.contains_key(id)
    }

    /// A copy of the stored record for `id`.
    pub fn get(&self, id: &str) -> Option<Record> {
        let state = self.state.read();
        state
            .positions
            .get(id)
            .map(|&position| state.records[position].clone())
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.state
            .read()
            .records
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    /// The embedder this store uses for text inserts and queries.
    pub fn embedder(&self) -> Option<&SharedEmbedder> {
        self.embedder.as_ref()
    }

    /// Store statistics.
    pub fn stats(&self) -> VectorStoreStats {
        let state = self.state.read();
        VectorStoreStats {
            name: self.config.name.clone(),
            count: state.records.len(),
            dimension: state.dimension,
            metric: self.config.metric,
            persistent: self.wal.is_some(),
            log_seq: self.wal.as_ref().map(|wal| wal.last_seq()),
        }
    }

    /// Insert pre-computed embeddings.
    ///
    /// `documents`, when given, must have one entry per id. The whole batch is
    /// validated before anything is stored: a length mismatch, a vector of the
    /// wrong dimension, a non-finite component or (under
    /// [`DuplicatePolicy::Reject`]) an existing or repeated id fails the call
    /// and leaves the store unchanged. An empty batch is a no-op.
    pub fn insert<I: Into<ItemId>>(
        &self,
        ids: Vec<I>,
        embeddings: Vec<Embedding>,
        documents: Option<Vec<String>>,
    ) -> Result<()> {
        let deadline = Deadline::after(self.config.timeout());
        let records = build_records(ids, embeddings, documents)?;
        self.apply_batch(records, &deadline, false).map(|_| ())
    }

    /// Embed `texts` with the store's embedder (one batch call) and insert them.
    ///
    /// Without explicit `documents` the texts themselves are stored as documents.
    pub fn insert_texts<I: Into<ItemId>>(
        &self,
        ids: Vec<I>,
        texts: Vec<String>,
        documents: Option<Vec<String>>,
    ) -> Result<()> {
        let deadline = Deadline::after(self.config.timeout());
        let (ids, embeddings, documents) = self.embed_for_insert(ids, texts, documents, &deadline)?;
        let records = build_records(ids, embeddings, Some(documents))?;
        self.apply_batch(records, &deadline, false).map(|_| ())
    }

    /// Insert texts only if the store is empty. Returns whether it inserted.
    ///
    /// The emptiness check is repeated under the write lock, so two racing
    /// populations never both apply.
    pub fn insert_texts_if_empty<I: Into<ItemId>>(
        &self,
        ids: Vec<I>,
        texts: Vec<String>,
        documents: Option<Vec<String>>,
    ) -> Result<bool> {
        if !self.is_empty() {
            log::debug!("collection '{}' already populated", self.name());
            return Ok(false);
        }

        let deadline = Deadline::after(self.config.timeout());
        let (ids, embeddings, documents) = self.embed_for_insert(ids, texts, documents, &deadline)?;
        let records = build_records(ids, embeddings, Some(documents))?;
        self.apply_batch(records, &deadline, true)
    }

    /// Query with pre-computed vectors; one result per query vector.
    pub fn query(&self, queries: &[Embedding], k: usize, include: Include) -> Result<Vec<QueryResult>> {
        let deadline = Deadline::after(self.config.timeout());
        self.query_with_deadline(queries, k, include, &deadline)
    }

    /// Embed `texts` (one batch call) and query with the results.
    pub fn query_texts(&self, texts: &[String], k: usize, include: Include) -> Result<Vec<QueryResult>> {
        validate_query_args(texts.len(), k)?;
        let deadline = Deadline::after(self.config.timeout());
        let embeddings = self.require_embedder()?.embed_batch(texts, deadline.remaining())?;
        self.query_with_deadline(&embeddings, k, include, &deadline)
    }

    /// Rewrite the record log to one entry per live record.
    ///
    /// Overwrites leave superseded entries in the log; compaction drops them.
    /// A no-op for in-memory stores.
    pub fn compact(&self) -> Result<()> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };

        let state = self.state.write();
        let mut entries = Vec::with_capacity(state.records.len() + 1);
        if let Some(dimension) = state.dimension {
            entries.push(WalEntry::Schema {
                dimension,
                metric: self.config.metric,
            });
        }
        entries.extend(state.records.iter().map(|record| WalEntry::Put {
            id: record.id.clone(),
            embedding: record.embedding.data.clone(),
            document: record.document.clone(),
        }));
        wal.rewrite(&entries)?;

        log::info!(
            "compacted collection '{}' to {} records",
            self.name(),
            state.records.len()
        );
        Ok(())
    }

    fn require_embedder(&self) -> Result<&SharedEmbedder> {
        self.embedder.as_ref().ok_or_else(|| {
            MarqueeError::invalid_config(format!(
                "collection '{}' has no embedder; insert or query with vectors instead",
                self.name()
            ))
        })
    }

    fn embed_for_insert<I: Into<ItemId>>(
        &self,
        ids: Vec<I>,
        texts: Vec<String>,
        documents: Option<Vec<String>>,
        deadline: &Deadline,
    ) -> Result<(Vec<I>, Vec<Embedding>, Vec<String>)> {
        if ids.len() != texts.len() {
            return Err(MarqueeError::invalid_argument(format!(
                "got {} ids but {} texts",
                ids.len(),
                texts.len()
            )));
        }
        if let Some(documents) = &documents {
            if documents.len() != ids.len() {
                return Err(MarqueeError::invalid_argument(format!(
                    "got {} ids but {} documents",
                    ids.len(),
                    documents.len()
                )));
            }
        }
        if ids.is_empty() {
            return Ok((ids, Vec::new(), Vec::new()));
        }

        let embeddings = self
            .require_embedder()?
            .embed_batch(&texts, deadline.remaining())?;
        Ok((ids, embeddings, documents.unwrap_or(texts)))
    }

    /// Validate and apply a batch under the write lock. With `only_if_empty`,
    /// nothing is applied (and `false` returned) unless the store is empty.
    fn apply_batch(&self, records: Vec<Record>, deadline: &Deadline, only_if_empty: bool) -> Result<bool> {
        if records.is_empty() {
            return Ok(false);
        }

        let mut state = self.state.write();
        if only_if_empty && !state.records.is_empty() {
            log::debug!("collection '{}' populated concurrently", self.name());
            return Ok(false);
        }

        let dimension = state
            .dimension
            .unwrap_or_else(|| records[0].embedding.dimension());
        self.validate_batch(&state, &records, dimension)?;
        deadline.check("insert")?;

        if let Some(wal) = &self.wal {
            let mut entries = Vec::with_capacity(records.len() + 1);
            // A non-empty log always starts with a schema entry.
            if state.records.is_empty() {
                entries.push(WalEntry::Schema {
                    dimension,
                    metric: self.config.metric,
                });
            }
            entries.extend(records.iter().map(|record| WalEntry::Put {
                id: record.id.clone(),
                embedding: record.embedding.data.clone(),
                document: record.document.clone(),
            }));
            wal.append_batch(&entries)?;
        }

        let inserted = records.len();
        state.dimension = Some(dimension);
        for record in records {
            state.apply(record);
        }

        log::debug!(
            "inserted {} records into '{}' (count {})",
            inserted,
            self.name(),
            state.records.len()
        );
        Ok(true)
    }

    fn validate_batch(&self, state: &StoreState, records: &[Record], dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(MarqueeError::invalid_argument(
                "embeddings must have at least one component",
            ));
        }

        let reject = self.config.duplicate_policy == DuplicatePolicy::Reject;
        let mut seen = AHashSet::with_capacity(records.len());
        for record in records {
            record.embedding.validate_dimension(dimension)?;
            if !record.embedding.is_valid() {
                return Err(MarqueeError::invalid_argument(format!(
                    "embedding for '{}' contains NaN or infinite values",
                    record.id
                )));
            }
            if reject && (state.positions.contains_key(&record.id) || !seen.insert(&record.id)) {
                return Err(MarqueeError::duplicate_id(record.id.as_str()));
            }
        }
        Ok(())
    }

    fn query_with_deadline(
        &self,
        queries: &[Embedding],
        k: usize,
        include: Include,
        deadline: &Deadline,
    ) -> Result<Vec<QueryResult>> {
        validate_query_args(queries.len(), k)?;

        let state = self.state.read();
        for query in queries {
            if let Some(dimension) = state.dimension {
                query.validate_dimension(dimension)?;
            }
            if !query.is_valid() {
                return Err(MarqueeError::invalid_argument(
                    "query vector contains NaN or infinite values",
                ));
            }
        }

        if state.records.is_empty() {
            return Ok(vec![QueryResult::default(); queries.len()]);
        }

        let vectors: Vec<&[f32]> = state
            .records
            .iter()
            .map(|record| record.embedding.as_slice())
            .collect();

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let neighbors = exact_knn(
                &vectors,
                query.as_slice(),
                k,
                self.config.metric,
                self.config.parallel_threshold,
                deadline,
            )?;

            let hits = neighbors
                .into_iter()
                .map(|neighbor| {
                    let record = &state.records[neighbor.position];
                    QueryHit {
                        id: record.id.clone(),
                        distance: include.distances.then_some(neighbor.distance),
                        document: if include.documents {
                            record.document.clone()
                        } else {
                            None
                        },
                        embedding: include.embeddings.then(|| record.embedding.clone()),
                    }
                })
                .collect();
            results.push(QueryResult { hits });
        }

        Ok(results)
    }
}

fn validate_query_args(query_count: usize, k: usize) -> Result<()> {
    if query_count == 0 {
        return Err(MarqueeError::invalid_argument("query batch is empty"));
    }
    if k == 0 {
        return Err(MarqueeError::invalid_argument("k must be positive"));
    }
    Ok(())
}

fn build_records<I: Into<ItemId>>(
    ids: Vec<I>,
    embeddings: Vec<Embedding>,
    documents: Option<Vec<String>>,
) -> Result<Vec<Record>> {
    if ids.len() != embeddings.len() {
        return Err(MarqueeError::invalid_argument(format!(
            "got {} ids but {} embeddings",
            ids.len(),
            embeddings.len()
        )));
    }

    let documents: Vec<Option<String>> = match documents {
        Some(documents) if documents.len() != ids.len() => {
            return Err(MarqueeError::invalid_argument(format!(
                "got {} ids but {} documents",
                ids.len(),
                documents.len()
            )));
        }
        Some(documents) => documents.into_iter().map(Some).collect(),
        None => vec![None; ids.len()],
    };

    Ok(ids
        .into_iter()
        .zip(embeddings)
        .zip(documents)
        .map(|((id, embedding), document)| Record {
            id: id.into(),
            embedding,
            document,
        })
        .collect())
}
