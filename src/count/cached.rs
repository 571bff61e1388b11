use crate::cache::DegreeCache;
use crate::description::DetachedEdgeDescription;
use crate::error::{DegreeCacheError, Result};
use crate::graph::GraphView;
use crate::model::VertexId;

use super::DegreeCounter;

/// Answers from the persisted entries only.
///
/// Every entry must be either more specific than the query or mutually exclusive with it.
/// An entry that is neither was produced by compaction merging matching and non-matching
/// edges, and the count fails with [`DegreeCacheError::UnableToCount`].
#[derive(Clone)]
pub struct CachedCounter {
    cache: DegreeCache,
}

impl CachedCounter {
    /// Creates a counter reading the entries of `cache`.
    pub fn new(cache: DegreeCache) -> Self {
        Self { cache }
    }
}

impl DegreeCounter for CachedCounter {
    fn count<G: GraphView>(
        &self,
        graph: &G,
        vertex: VertexId,
        description: &DetachedEdgeDescription,
    ) -> Result<i64> {
        let direction = description.direction().as_str();
        let mut total = 0;
        for (candidate, degree) in self.cache.read_entries(graph, vertex)? {
            if candidate.is_more_specific_than(description) {
                total += degree;
            } else if !candidate.is_mutually_exclusive(description) {
                self.cache.metrics().unable_to_count(direction);
                return Err(DegreeCacheError::UnableToCount {
                    description: description.to_string(),
                });
            }
        }
        self.cache.metrics().cached_answer(direction);
        Ok(total)
    }
}
