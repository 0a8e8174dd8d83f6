//! Vector storage and exact nearest-neighbor search.
//!
//! # Module Structure
//!
//! - `core`: value types (embedding, distance metric, record)
//! - `search`: exact k-NN scan, ranking and result types
//! - `wal`: checksummed record log behind persisted stores
//! - `store`: the vector store
//! - `collection`: named stores with get-or-create semantics

pub mod collection;
pub mod core;
pub mod search;
pub mod store;
pub mod wal;

pub use self::collection::CollectionManager;
pub use self::core::distance::DistanceMetric;
pub use self::core::embedding::Embedding;
pub use self::core::record::{ItemId, Record};
pub use self::search::{Include, QueryHit, QueryResult};
pub use self::store::{DuplicatePolicy, VectorStore, VectorStoreConfig};
