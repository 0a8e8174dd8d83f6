//! Error types for Marquee.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`MarqueeError`] enum. Constructor helpers mirror the variant names so call
//! sites read as `MarqueeError::invalid_argument("k must be positive")`.
//!
//! # Examples
//!
//! ```
//! use marquee::error::{MarqueeError, Result};
//!
//! fn check_k(k: usize) -> Result<()> {
//!     if k == 0 {
//!         return Err(MarqueeError::invalid_argument("k must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_k(0).is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Marquee operations.
#[derive(Error, Debug)]
pub enum MarqueeError {
    /// An embedding's length differs from the store's established dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The store's dimension.
        expected: usize,
        /// The offending vector's length.
        actual: usize,
    },

    /// Insert of an id that already exists under the reject policy.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Bad arguments: zero k, mismatched batch lengths, empty batches.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding function failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// An operation exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage-related errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted data failed validation.
    #[error("Corruption: {0}")]
    Corruption(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal invariant failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with MarqueeError.
pub type Result<T> = std::result::Result<T, MarqueeError>;

impl MarqueeError {
    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        MarqueeError::DimensionMismatch { expected, actual }
    }

    /// Create a new duplicate id error.
    pub fn duplicate_id<S: Into<String>>(id: S) -> Self {
        MarqueeError::DuplicateId(id.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        MarqueeError::InvalidArgument(msg.into())
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        MarqueeError::Embedding(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        MarqueeError::Timeout(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        MarqueeError::NotFound(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        MarqueeError::Storage(msg.into())
    }

    /// Create a new corruption error.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        MarqueeError::Corruption(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        MarqueeError::InvalidConfig(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        MarqueeError::Internal(msg.into())
    }
}
