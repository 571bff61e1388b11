use std::sync::Arc;

use tracing::trace;

use crate::description::{DetachedEdgeDescription, LazyPropertiesDescription, PropertiesDescription};
use crate::error::Result;
use crate::graph::{FilteredEdge, GraphEdge, GraphView, InclusionPolicies};
use crate::model::{Direction, VertexId};
use crate::weigh::{checked_weight, WeighingStrategy};

use super::DegreeCounter;

/// Counts by scanning the vertex's live edges. Never consults the cache.
///
/// A self-loop is counted twice for a [`Direction::Both`] query.
#[derive(Debug, Clone)]
pub struct NaiveCounter {
    weighing: Arc<dyn WeighingStrategy>,
    inclusion: InclusionPolicies,
}

impl NaiveCounter {
    /// Creates a counter using `weighing` and honouring `inclusion`.
    pub fn new(weighing: Arc<dyn WeighingStrategy>, inclusion: InclusionPolicies) -> Self {
        Self {
            weighing,
            inclusion,
        }
    }
}

impl DegreeCounter for NaiveCounter {
    fn count<G: GraphView>(
        &self,
        graph: &G,
        vertex: VertexId,
        description: &DetachedEdgeDescription,
    ) -> Result<i64> {
        let edges = graph.edges_of(vertex, description.direction(), Some(description.edge_type()))?;
        let mut total = 0;
        for edge in &edges {
            if !self.inclusion.include_edge(edge) {
                continue;
            }
            let filtered = FilteredEdge::new(edge, &self.inclusion);
            let candidate = LazyPropertiesDescription::new(&filtered);
            if !description.properties().is_more_general_than(&candidate) {
                continue;
            }
            let weight = checked_weight(self.weighing.as_ref(), edge, vertex)?;
            total += weight;
            if description.direction() == Direction::Both && edge.is_self_loop() {
                total += weight;
            }
        }
        trace!(vertex = %vertex, scanned = edges.len(), total, "relcount.count.naive");
        Ok(total)
    }
}
