//! Distance metrics for vector similarity calculation.
//!
//! Every metric is expressed as a distance: smaller means more similar, so a
//! single ascending sort ranks results for any metric.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};

/// Distance metrics for vector similarity calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance, `Σ (aᵢ − bᵢ)²`. Ranks identically to
    /// Euclidean without the square root.
    #[default]
    SquaredEuclidean,
    /// Euclidean (L2) distance
    Euclidean,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
    /// Negated inner product
    InnerProduct,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors using this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(MarqueeError::dimension_mismatch(a.len(), b.len()));
        }
        Ok(self.distance_unchecked(a, b))
    }

    /// Distance without the length check. Callers guarantee `a.len() == b.len()`.
    pub(crate) fn distance_unchecked(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredEuclidean => squared_euclidean(a, b),
            DistanceMetric::Euclidean => squared_euclidean(a, b).sqrt(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0 // Maximum distance for zero vectors
                } else {
                    1.0 - (dot / (norm_a * norm_b))
                }
            }
            DistanceMetric::InnerProduct => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
        }
    }

    /// Get the name of this distance metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::SquaredEuclidean => "l2",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "ip",
        }
    }

    /// Parse a distance metric from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l2" | "squared_euclidean" => Ok(DistanceMetric::SquaredEuclidean),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            "ip" | "inner_product" | "dot" => Ok(DistanceMetric::InnerProduct),
            _ => Err(MarqueeError::invalid_config(format!(
                "Unknown distance metric: {s}"
            ))),
        }
    }

    /// Calculate the distance between a query and many vectors, in parallel
    /// once the batch reaches `parallel_threshold`.
    pub fn batch_distance(
        &self,
        query: &[f32],
        vectors: &[&[f32]],
        parallel_threshold: usize,
    ) -> Result<Vec<f32>> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != query.len()) {
            return Err(MarqueeError::dimension_mismatch(bad.len(), query.len()));
        }

        if vectors.len() < parallel_threshold.max(1) {
            return Ok(vectors
                .iter()
                .map(|v| self.distance_unchecked(query, v))
                .collect());
        }

        Ok(vectors
            .par_iter()
            .map(|v| self.distance_unchecked(query, v))
            .collect())
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = MarqueeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

#[inline]
fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
