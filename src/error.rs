use std::io;

use thiserror::Error;
use tracing::warn;

use crate::model::VertexId;

/// Result alias used throughout the degree cache.
pub type Result<T> = std::result::Result<T, DegreeCacheError>;

/// Errors raised by the degree cache, its counters and the reference host.
#[derive(Debug, Error)]
pub enum DegreeCacheError {
    /// The cached entries cannot answer the query exactly because compaction merged
    /// matching and non-matching edges into one bucket.
    #[error("unable to count edges matching {description}: compaction removed the required granularity")]
    UnableToCount {
        /// Human readable form of the query description.
        description: String,
    },
    /// The cache diverged from the graph and must be rebuilt for the vertex.
    #[error("degree cache of vertex {vertex} needs reinitialization: {reason}")]
    NeedsReinitialization {
        /// Vertex whose cached degrees are out of sync.
        vertex: VertexId,
        /// What was observed.
        reason: String,
    },
    /// A caching scope was used out of order.
    #[error("illegal caching scope usage: {0}")]
    IllegalScope(&'static str),
    /// A caller violated a precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Persisted entries or description strings could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The referenced graph element does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DegreeCacheError {
    /// Whether the error means the cache has to be rebuilt before it can be trusted.
    pub fn needs_reinitialization(&self) -> bool {
        matches!(self, DegreeCacheError::NeedsReinitialization { .. })
    }

    /// Whether the error only means the cached counter could not answer exactly.
    pub fn is_unable_to_count(&self) -> bool {
        matches!(self, DegreeCacheError::UnableToCount { .. })
    }

    pub(crate) fn out_of_sync(vertex: VertexId, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(vertex = %vertex, reason = %reason, "relcount.cache.out_of_sync");
        DegreeCacheError::NeedsReinitialization { vertex, reason }
    }
}
