//! Text embedding support.
//!
//! Marquee treats the embedding model as an external collaborator behind the
//! [`TextEmbedder`](text_embedder::TextEmbedder) trait. The crate ships
//! [`HashingEmbedder`](hashing::HashingEmbedder), a deterministic feature
//! hasher that needs no model files. Stores fed only with pre-computed vectors
//! take no embedder at all.
//!
//! Stores call embedders through [`SharedEmbedder`](executor::SharedEmbedder),
//! which blocks on the async trait and is shared by every store of a process.

pub mod executor;
pub mod hashing;
pub mod text_embedder;
