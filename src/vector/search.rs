//! Exact k-nearest-neighbor search and query result types.
//!
//! Search is a linear scan: every stored vector is compared with the query
//! and the `k` smallest distances are kept. Equal distances are ordered by
//! insertion position, so repeated queries against an unchanged store return
//! identical rankings.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};
use crate::vector::core::distance::DistanceMetric;
use crate::vector::core::embedding::Embedding;
use crate::vector::core::record::ItemId;

/// Number of vectors scored between two deadline checks.
const SCAN_CHUNK: usize = 4096;

/// Which optional fields a query returns alongside ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    /// Return distances.
    pub distances: bool,
    /// Return stored documents.
    pub documents: bool,
    /// Return stored embeddings.
    pub embeddings: bool,
}

impl Default for Include {
    fn default() -> Self {
        Self {
            distances: true,
            documents: true,
            embeddings: false,
        }
    }
}

impl Include {
    /// Ids only.
    pub fn none() -> Self {
        Self {
            distances: false,
            documents: false,
            embeddings: false,
        }
    }

    /// Distances, documents and embeddings.
    pub fn all() -> Self {
        Self {
            distances: true,
            documents: true,
            embeddings: true,
        }
    }

    /// Ids and distances.
    pub fn distances_only() -> Self {
        Self {
            distances: true,
            ..Self::none()
        }
    }

    pub fn with_documents(mut self, documents: bool) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_embeddings(mut self, embeddings: bool) -> Self {
        self.embeddings = embeddings;
        self
    }
}

/// One neighbor in a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Item identifier.
    pub id: ItemId,
    /// Distance to the query, if requested.
    pub distance: Option<f32>,
    /// Stored document, if requested and present.
    pub document: Option<String>,
    /// Stored embedding, if requested.
    pub embedding: Option<Embedding>,
}

/// The neighbors of one query vector, ascending by distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<QueryHit>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Ids in rank order.
    pub fn ids(&self) -> Vec<&ItemId> {
        self.hits.iter().map(|hit| &hit.id).collect()
    }

    /// Documents in rank order; hits without a document are skipped.
    pub fn documents(&self) -> Vec<&str> {
        self.hits
            .iter()
            .filter_map(|hit| hit.document.as_deref())
            .collect()
    }
}

/// A scored candidate: its insertion position and distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

/// Deadline for one operation, created from an optional timeout.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn after(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Time left before the deadline, `None` when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    /// Fail with [`MarqueeError::Timeout`] once the deadline has passed.
    pub fn check(&self, operation: &str) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.started.elapsed() > limit {
                return Err(MarqueeError::timeout(format!(
                    "{operation} exceeded {} ms",
                    limit.as_millis()
                )));
            }
        }
        Ok(())
    }
}

/// Exact k-NN by linear scan.
///
/// `vectors` are in insertion order; the returned neighbors reference them by
/// position. Returns at most `k` neighbors, ascending by distance with
/// insertion position as the tie-break.
pub fn exact_knn(
    vectors: &[&[f32]],
    query: &[f32],
    k: usize,
    metric: DistanceMetric,
    parallel_threshold: usize,
    deadline: &Deadline,
) -> Result<Vec<Neighbor>> {
    if k == 0 || vectors.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::with_capacity(vectors.len());
    for (chunk_index, chunk) in vectors.chunks(SCAN_CHUNK).enumerate() {
        deadline.check("query")?;
        let distances = metric.batch_distance(query, chunk, parallel_threshold)?;
        let base = chunk_index * SCAN_CHUNK;
        candidates.extend(
            distances
                .into_iter()
                .enumerate()
                .map(|(offset, distance)| Neighbor {
                    position: base + offset,
                    distance,
                }),
        );
    }

    Ok(top_k(candidates, k))
}

/// Keep the `k` best candidates in rank order.
pub fn top_k(mut candidates: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }
    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, Neighbor::rank_cmp);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(Neighbor::rank_cmp);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(data: &[Vec<f32>]) -> Vec<&[f32]> {
        data.iter().map(|v| v.as_slice()).collect()
    }

    #[test]
    fn test_exact_ranking() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]];
        let neighbors = exact_knn(
            &refs(&data),
            &[0.0, 0.0],
            2,
            DistanceMetric::SquaredEuclidean,
            usize::MAX,
            &Deadline::after(None),
        )
        .unwrap();

        assert_eq!(
            neighbors,
            vec![
                Neighbor {
                    position: 0,
                    distance: 0.0
                },
                Neighbor {
                    position: 1,
                    distance: 1.0
                },
            ]
        );
    }

    #[test]
    fn test_ties_break_by_insertion_position() {
        let data = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ];
        for _ in 0..5 {
            let neighbors = exact_knn(
                &refs(&data),
                &[0.0, 0.0],
                3,
                DistanceMetric::SquaredEuclidean,
                usize::MAX,
                &Deadline::after(None),
            )
            .unwrap();
            let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
            assert_eq!(positions, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_k_larger_than_store() {
        let data = vec![vec![1.0], vec![2.0], vec![3.0]];
        let neighbors = exact_knn(
            &refs(&data),
            &[0.0],
            10,
            DistanceMetric::SquaredEuclidean,
            usize::MAX,
            &Deadline::after(None),
        )
        .unwrap();
        assert_eq!(neighbors.len(), 3);
        assert_eq!(neighbors[2].distance, 9.0);
    }

    #[test]
    fn test_parallel_scan_matches_serial() {
        let data: Vec<Vec<f32>> = (0..5000)
            .map(|i| vec![(i % 97) as f32, (i % 13) as f32])
            .collect();
        let query = [40.0, 6.0];
        let serial = exact_knn(
            &refs(&data),
            &query,
            25,
            DistanceMetric::SquaredEuclidean,
            usize::MAX,
            &Deadline::after(None),
        )
        .unwrap();
        let parallel = exact_knn(
            &refs(&data),
            &query,
            25,
            DistanceMetric::SquaredEuclidean,
            1,
            &Deadline::after(None),
        )
        .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let data = vec![vec![1.0]];
        let deadline = Deadline::after(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        let err = exact_knn(
            &refs(&data),
            &[0.0],
            1,
            DistanceMetric::SquaredEuclidean,
            usize::MAX,
            &deadline,
        )
        .unwrap_err();
        assert!(matches!(err, MarqueeError::Timeout(_)));
    }

    #[test]
    fn test_top_k_zero() {
        let candidates = vec![Neighbor {
            position: 0,
            distance: 1.0,
        }];
        assert!(top_k(candidates, 0).is_empty());
    }

    #[test]
    fn test_include_presets() {
        assert!(Include::default().distances);
        assert!(Include::default().documents);
        assert!(!Include::default().embeddings);
        assert!(Include::all().embeddings);
        assert!(!Include::distances_only().documents);
        assert!(Include::none().with_embeddings(true).embeddings);
    }
}
