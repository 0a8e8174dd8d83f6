//! Synchronous bridge to asynchronous embedders.
//!
//! Vector stores are synchronous, while [`TextEmbedder`] is async so that
//! remote or model-backed embedders can await I/O. [`EmbedderExecutor`] owns a
//! small tokio runtime and blocks the calling thread until an embedding batch
//! completes. [`SharedEmbedder`] pairs one embedder with one executor so that
//! every store in a process shares the same (possibly large) model.

use std::future::Future;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use tokio::runtime::Builder as TokioRuntimeBuilder;

use crate::embedding::text_embedder::TextEmbedder;
use crate::error::{MarqueeError, Result};
use crate::vector::core::embedding::Embedding;

/// Runs embedder futures to completion from synchronous code.
///
/// Must not be dropped from inside an async context.
#[derive(Clone)]
pub struct EmbedderExecutor {
    runtime: Arc<tokio::runtime::Runtime>,
}

impl std::fmt::Debug for EmbedderExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderExecutor").finish_non_exhaustive()
    }
}

impl EmbedderExecutor {
    /// Create an executor with a two-thread runtime.
    pub fn new() -> Result<Self> {
        let runtime = TokioRuntimeBuilder::new_multi_thread()
            .worker_threads(2)
            .thread_name("marquee-embedder")
            .enable_all()
            .build()
            .map_err(|err| {
                MarqueeError::internal(format!("failed to initialize embedder runtime: {err}"))
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Run a future on the executor's runtime and wait for its result.
    ///
    /// With a `timeout`, a future that does not finish in time is cancelled
    /// and the call fails with [`MarqueeError::Timeout`].
    pub fn run<F, T>(&self, future: F, timeout: Option<Duration>) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.runtime.spawn(async move {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, future).await {
                    Ok(result) => result,
                    Err(_) => Err(MarqueeError::timeout(format!(
                        "embedding did not finish within {} ms",
                        limit.as_millis()
                    ))),
                },
                None => future.await,
            };
            let _ = tx.send(outcome);
        });
        rx.recv().map_err(|err| {
            MarqueeError::internal(format!("embedder task channel closed: {err}"))
        })?
    }
}

/// One embedder plus the executor that drives it, cheap to clone and share.
#[derive(Clone)]
pub struct SharedEmbedder {
    embedder: Arc<dyn TextEmbedder>,
    executor: EmbedderExecutor,
}

impl std::fmt::Debug for SharedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEmbedder")
            .field("name", &self.embedder.name())
            .field("dimension", &self.embedder.dimension())
            .finish()
    }
}

impl SharedEmbedder {
    /// Wrap an embedder with a fresh executor.
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Result<Self> {
        Ok(Self {
            embedder,
            executor: EmbedderExecutor::new()?,
        })
    }

    /// Wrap an embedder with an existing executor.
    pub fn with_executor(embedder: Arc<dyn TextEmbedder>, executor: EmbedderExecutor) -> Self {
        Self { embedder, executor }
    }

    /// The wrapped embedder.
    pub fn embedder(&self) -> &Arc<dyn TextEmbedder> {
        &self.embedder
    }

    /// Dimension advertised by the embedder.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Name of the embedder.
    pub fn name(&self) -> &str {
        self.embedder.name()
    }

    /// Embed a batch of texts with a single embedder call.
    ///
    /// Any embedder failure is reported as [`MarqueeError::Embedding`] (a
    /// timeout stays a [`MarqueeError::Timeout`]). The result always has one
    /// embedding per input text.
    pub fn embed_batch(&self, texts: &[String], timeout: Option<Duration>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embedder = Arc::clone(&self.embedder);
        let owned = texts.to_vec();
        let embeddings = self
            .executor
            .run(async move { embedder.embed_batch(&owned).await }, timeout)
            .map_err(|err| match err {
                err @ (MarqueeError::Embedding(_) | MarqueeError::Timeout(_)) => err,
                other => MarqueeError::embedding(other.to_string()),
            })?;

        if embeddings.len() != texts.len() {
            return Err(MarqueeError::embedding(format!(
                "embedder '{}' returned {} vectors for {} texts",
                self.name(),
                embeddings.len(),
                texts.len()
            )));
        }

        log::debug!(
            "embedded {} texts with '{}' (dimension {})",
            texts.len(),
            self.name(),
            self.dimension()
        );
        Ok(embeddings)
    }
}
