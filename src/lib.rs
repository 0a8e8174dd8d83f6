//! # Marquee
//!
//! Cold-start movie recommendations from text similarity.
//!
//! Each movie is rendered into a short text, embedded into a fixed-size
//! vector and stored in a named vector store. Recommendations are the nearest
//! stored vectors to an embedded query, ranked by squared Euclidean distance.
//!
//! ## Features
//!
//! - Exact k-nearest-neighbor search with deterministic tie-breaking
//! - Named collections with get-or-create and populate-if-empty semantics
//! - Crash-safe, checksummed record logs on pluggable storage
//! - Pluggable async text embedders shared across all collections

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod movie;
pub mod recommend;
pub mod storage;
pub mod vector;

pub mod prelude {
    pub use crate::config::MarqueeConfig;
    pub use crate::embedding::executor::SharedEmbedder;
    pub use crate::embedding::hashing::HashingEmbedder;
    pub use crate::embedding::text_embedder::TextEmbedder;
    pub use crate::error::{MarqueeError, Result};
    pub use crate::movie::{DocumentTemplate, GenreTable, Movie};
    pub use crate::recommend::{Recommendation, Recommender};
    pub use crate::vector::{
        CollectionManager, DistanceMetric, DuplicatePolicy, Embedding, Include, ItemId,
        VectorStore, VectorStoreConfig,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
