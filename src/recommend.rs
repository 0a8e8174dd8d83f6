//! Recommendation query path: free text or a stored item in, ranked items out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};
use crate::vector::core::embedding::Embedding;
use crate::vector::core::record::ItemId;
use crate::vector::search::{Include, QueryResult};
use crate::vector::store::VectorStore;

/// One recommended item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: ItemId,
    /// The stored document, typically the rendered movie description.
    pub document: Option<String>,
    /// Distance to the query; smaller is more similar.
    pub distance: f32,
}

/// Answers recommendation queries against one store.
#[derive(Debug, Clone)]
pub struct Recommender {
    store: Arc<VectorStore>,
    max_distance: Option<f32>,
}

impl Recommender {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self {
            store,
            max_distance: None,
        }
    }

    /// Drop results farther than `max_distance` from the query.
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// The store being queried.
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Items most similar to `query_text`, ascending by distance.
    ///
    /// `k == 0` or an empty store yields an empty list.
    pub fn recommend(&self, query_text: &str, k: usize) -> Result<Vec<Recommendation>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = self
            .store
            .query_texts(&[query_text.to_string()], k, Include::default())?;
        Ok(self.collect(results.pop().unwrap_or_default(), None))
    }

    /// Like [`recommend`](Self::recommend), ids only.
    pub fn recommend_ids(&self, query_text: &str, k: usize) -> Result<Vec<ItemId>> {
        Ok(self
            .recommend(query_text, k)?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Items most similar to a pre-computed query vector.
    pub fn recommend_vector(&self, query: &Embedding, k: usize) -> Result<Vec<Recommendation>> {
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = self
            .store
            .query(std::slice::from_ref(query), k, Include::default())?;
        Ok(self.collect(results.pop().unwrap_or_default(), None))
    }

    /// Items most similar to the stored item `id`, excluding the item itself.
    pub fn recommend_similar(&self, id: &str, k: usize) -> Result<Vec<Recommendation>> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| MarqueeError::not_found(format!("item '{id}' in '{}'", self.store.name())))?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results = self
            .store
            .query(&[record.embedding], k.saturating_add(1), Include::default())?;
        let mut recommendations = self.collect(results.pop().unwrap_or_default(), Some(&record.id));
        recommendations.truncate(k);
        Ok(recommendations)
    }

    fn collect(&self, result: QueryResult, exclude: Option<&ItemId>) -> Vec<Recommendation> {
        result
            .hits
            .into_iter()
            .filter(|hit| Some(&hit.id) != exclude)
            .filter_map(|hit| {
                let distance = hit.distance?;
                match self.max_distance {
                    Some(max) if distance > max => None,
                    _ => Some(Recommendation {
                        id: hit.id,
                        document: hit.document,
                        distance,
                    }),
                }
            })
            .collect()
    }
}
