//! Deterministic feature-hashing text embedder.
//!
//! [`HashingEmbedder`] needs no model files: each lowercase word and each
//! character trigram of a word is hashed with CRC32 into one of `dimension`
//! buckets with a hash-derived sign, and the resulting vector is L2
//! normalized. Texts that share vocabulary end up close together, which is
//! enough to drive the recommendation pipeline in tests and offline runs.
//! Real language models plug in through [`TextEmbedder`] instead.

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::embedding::text_embedder::TextEmbedder;
use crate::error::{MarqueeError, Result};
use crate::vector::core::embedding::Embedding;

/// Weight of a whole-word feature relative to a trigram feature.
const WORD_WEIGHT: f32 = 2.0;

/// Feature-hashing embedder over words and character trigrams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    trigrams: bool,
}

impl HashingEmbedder {
    /// Create a new hashing embedder with word and trigram features.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(MarqueeError::invalid_config(
                "embedding dimension must be positive",
            ));
        }
        Ok(Self {
            dimension,
            trigrams: true,
        })
    }

    /// Disable character trigram features (whole words only).
    pub fn words_only(mut self) -> Self {
        self.trigrams = false;
        self
    }

    fn add_feature(&self, data: &mut [f32], feature: &str, weight: f32) {
        let hash = crc32fast::hash(feature.as_bytes());
        let bucket = (hash as usize) % self.dimension;
        let sign = if hash & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
        data[bucket] += sign * weight;
    }

    fn embed_sync(&self, text: &str) -> Embedding {
        let mut data = vec![0.0f32; self.dimension];

        for word in text.unicode_words() {
            let word = word.to_lowercase();
            self.add_feature(&mut data, &word, WORD_WEIGHT);

            if self.trigrams {
                let padded: Vec<char> = format!("<{word}>").chars().collect();
                for window in padded.windows(3) {
                    let gram: String = window.iter().collect();
                    self.add_feature(&mut data, &gram, 1.0);
                }
            }
        }

        let mut embedding = Embedding::new(data);
        embedding.normalize();
        embedding
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_sync(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
