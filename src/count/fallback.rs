use std::sync::Arc;

use tracing::warn;

use crate::description::DetachedEdgeDescription;
use crate::error::{DegreeCacheError, Result};
use crate::graph::GraphView;
use crate::metrics::DegreeMetrics;
use crate::model::VertexId;

use super::{CachedCounter, DegreeCounter, NaiveCounter};

/// Tries the cache first and scans the graph when the cache cannot answer exactly.
///
/// Falls back on [`DegreeCacheError::UnableToCount`] and on unreadable entries; other errors,
/// such as an unknown vertex, are returned.
#[derive(Clone)]
pub struct FallbackCounter {
    cached: CachedCounter,
    naive: NaiveCounter,
    metrics: Arc<dyn DegreeMetrics>,
}

impl FallbackCounter {
    /// Combines a cached and a naive counter.
    pub fn new(cached: CachedCounter, naive: NaiveCounter, metrics: Arc<dyn DegreeMetrics>) -> Self {
        Self {
            cached,
            naive,
            metrics,
        }
    }
}

impl DegreeCounter for FallbackCounter {
    fn count<G: GraphView>(
        &self,
        graph: &G,
        vertex: VertexId,
        description: &DetachedEdgeDescription,
    ) -> Result<i64> {
        match self.cached.count(graph, vertex, description) {
            Err(err @ (DegreeCacheError::UnableToCount { .. } | DegreeCacheError::Serialization(_))) => {
                warn!(
                    vertex = %vertex,
                    query = %description,
                    reason = %err,
                    "relcount.count.fallback"
                );
                self.metrics.fallback();
                self.naive.count(graph, vertex, description)
            }
            other => other,
        }
    }
}
