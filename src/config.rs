//! Application configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};
use crate::vector::core::distance::DistanceMetric;
use crate::vector::store::{DuplicatePolicy, VectorStoreConfig, validate_collection_name};

/// Settings for the movie recommender, stored as JSON.
///
/// Missing fields take their defaults, so a config file only needs the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarqueeConfig {
    /// Directory holding collection logs. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Output dimension of the embedder.
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub duplicate_policy: DuplicatePolicy,
    /// Number of recommendations when none is requested.
    pub default_k: usize,
    /// Collection of movie titles.
    pub title_collection: String,
    /// Collection of full movie descriptions.
    pub description_collection: String,
    pub parallel_threshold: usize,
    pub query_timeout_ms: Option<u64>,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            dimension: 384,
            metric: DistanceMetric::SquaredEuclidean,
            duplicate_policy: DuplicatePolicy::Reject,
            default_k: 10,
            title_collection: "movie_titles".to_string(),
            description_collection: "movies".to_string(),
            parallel_threshold: 1024,
            query_timeout_ms: None,
        }
    }
}

impl MarqueeConfig {
    /// Load a configuration file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            MarqueeError::invalid_config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(MarqueeError::invalid_config("dimension must be positive"));
        }
        if self.default_k == 0 {
            return Err(MarqueeError::invalid_config("default_k must be positive"));
        }
        if self.parallel_threshold == 0 {
            return Err(MarqueeError::invalid_config(
                "parallel_threshold must be positive",
            ));
        }
        validate_collection_name(&self.title_collection)?;
        validate_collection_name(&self.description_collection)?;
        if self.title_collection == self.description_collection {
            return Err(MarqueeError::invalid_config(
                "title and description collections must differ",
            ));
        }
        Ok(())
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, data_dir: P) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Settings shared by every store; the name is set per collection.
    pub fn store_template(&self) -> VectorStoreConfig {
        VectorStoreConfig {
            name: self.description_collection.clone(),
            dimension: Some(self.dimension),
            metric: self.metric,
            duplicate_policy: self.duplicate_policy,
            parallel_threshold: self.parallel_threshold,
            timeout_ms: self.query_timeout_ms,
        }
    }
}
