//! Storage abstraction layer.
//!
//! Vector stores write their record logs through the [`Storage`] trait, so a
//! collection can live on disk ([`FileStorage`]) or only in memory
//! ([`MemoryStorage`]) without any change to the store itself.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::*;
pub use memory::*;
pub use traits::*;
