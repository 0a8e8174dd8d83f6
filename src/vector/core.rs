//! Core vector value types.

pub mod distance;
pub mod embedding;
pub mod record;
