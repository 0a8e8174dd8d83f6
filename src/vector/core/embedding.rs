//! Dense embedding vector.

use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};

/// A dense, fixed-length vector produced by an embedding function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector components.
    pub data: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from its components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimensionality of this embedding.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Borrow the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Calculate the L2 norm (magnitude) of this embedding.
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalize this embedding to unit length. Zero vectors are left untouched.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.data {
                *value /= norm;
            }
        }
    }

    /// Validate that this embedding has the expected dimension.
    pub fn validate_dimension(&self, expected_dim: usize) -> Result<()> {
        if self.data.len() != expected_dim {
            return Err(MarqueeError::dimension_mismatch(expected_dim, self.data.len()));
        }
        Ok(())
    }

    /// Check that no component is NaN or infinite.
    pub fn is_valid(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

impl From<&[f32]> for Embedding {
    fn from(data: &[f32]) -> Self {
        Self::new(data.to_vec())
    }
}

impl<const N: usize> From<[f32; N]> for Embedding {
    fn from(data: [f32; N]) -> Self {
        Self::new(data.to_vec())
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.data
    }
}
