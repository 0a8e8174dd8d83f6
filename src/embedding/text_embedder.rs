//! Text embedding trait: the external "embedding function" contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::vector::core::embedding::Embedding;

/// Trait for converting text to vector embeddings.
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector, otherwise query results are not reproducible across runs.
/// Every embedding produced by one embedder has the same [`dimension`].
///
/// [`dimension`]: TextEmbedder::dimension
///
/// # Custom implementation
///
/// ```
/// use async_trait::async_trait;
/// use marquee::embedding::text_embedder::TextEmbedder;
/// use marquee::error::Result;
/// use marquee::vector::core::embedding::Embedding;
///
/// struct ConstantEmbedder {
///     dimension: usize,
/// }
///
/// #[async_trait]
/// impl TextEmbedder for ConstantEmbedder {
///     async fn embed(&self, _text: &str) -> Result<Embedding> {
///         Ok(Embedding::new(vec![0.0; self.dimension]))
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
/// }
/// ```
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Generate an embedding vector for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// The default implementation calls `embed` sequentially. Model-backed
    /// embedders should override it to run the whole batch in one call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Get the dimension of generated embeddings.
    fn dimension(&self) -> usize;

    /// Get the name/identifier of this embedder, for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
