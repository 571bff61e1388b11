//! Degree queries: full scan, cache lookup, and cache lookup with scan fallback.

mod cached;
mod fallback;
mod naive;

use crate::description::DetachedEdgeDescription;
use crate::error::Result;
use crate::graph::GraphView;
use crate::model::VertexId;

pub use cached::CachedCounter;
pub use fallback::FallbackCounter;
pub use naive::NaiveCounter;

/// Counts the (weighted) edges of a vertex matching a description.
pub trait DegreeCounter {
    /// Degree of `vertex` for `description`.
    fn count<G: GraphView>(
        &self,
        graph: &G,
        vertex: VertexId,
        description: &DetachedEdgeDescription,
    ) -> Result<i64>;
}
