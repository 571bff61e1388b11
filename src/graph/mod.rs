//! Interfaces the degree cache consumes from its host graph, plus an in-memory host.

mod filter;
mod memory;

use std::collections::BTreeSet;

use crate::error::{DegreeCacheError, Result};
use crate::model::{Direction, EdgeId, PropertyValue, VertexId};

pub use filter::{FilteredEdge, InclusionPolicies};
pub use memory::{MemoryEdge, MemoryGraph};

/// Read access to the properties of a vertex or an edge.
pub trait PropertyContainer {
    /// Value of `key`, `None` when absent.
    fn property(&self, key: &str) -> Option<PropertyValue>;

    /// Keys of all present properties.
    fn property_keys(&self) -> Vec<String>;

    /// Whether `key` is present.
    fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some()
    }
}

/// A live edge of the host graph.
pub trait GraphEdge: PropertyContainer {
    /// Stable identity.
    fn id(&self) -> EdgeId;

    /// Relationship type.
    fn edge_type(&self) -> &str;

    /// Vertex the edge starts at.
    fn start_vertex(&self) -> VertexId;

    /// Vertex the edge ends at.
    fn end_vertex(&self) -> VertexId;

    /// Whether the edge starts and ends at the same vertex.
    fn is_self_loop(&self) -> bool {
        self.start_vertex() == self.end_vertex()
    }

    /// The endpoint that is not `vertex`, or `vertex` itself for a self-loop.
    fn other_vertex(&self, vertex: VertexId) -> VertexId {
        if self.start_vertex() == vertex {
            self.end_vertex()
        } else {
            self.start_vertex()
        }
    }

    /// The edge before any property filtering, when this is a filtered view.
    ///
    /// Weighing strategies read this edge, hidden properties included.
    fn unfiltered(&self) -> Option<&dyn GraphEdge> {
        None
    }
}

/// Vertex property storage used to persist cached degrees.
pub trait VertexPropertyStore {
    /// Reads one vertex property.
    fn vertex_property(&self, vertex: VertexId, key: &str) -> Result<Option<PropertyValue>>;

    /// Lists the keys of a vertex's properties.
    fn vertex_property_keys(&self, vertex: VertexId) -> Result<Vec<String>>;

    /// Writes one vertex property.
    fn set_vertex_property(
        &mut self,
        vertex: VertexId,
        key: &str,
        value: PropertyValue,
    ) -> Result<()>;

    /// Removes one vertex property; removing an absent key is not an error.
    fn remove_vertex_property(&mut self, vertex: VertexId, key: &str) -> Result<()>;
}

/// Read access to vertices and their incident edges.
pub trait GraphView: VertexPropertyStore {
    /// Edge handle returned by [`GraphView::edges_of`].
    type Edge: GraphEdge + Clone;

    /// All vertex identities, ascending.
    fn vertex_ids(&self) -> Vec<VertexId>;

    /// Whether the vertex exists.
    fn contains_vertex(&self, vertex: VertexId) -> bool;

    /// Edges incident to `vertex` in `direction`, optionally restricted to one type.
    ///
    /// With [`Direction::Both`] a self-loop is returned once.
    fn edges_of(
        &self,
        vertex: VertexId,
        direction: Direction,
        edge_type: Option<&str>,
    ) -> Result<Vec<Self::Edge>>;
}

/// Edges changed by one unit of work, as delivered to the degree cache.
#[derive(Debug, Clone)]
pub struct MutationBatch<E> {
    /// Edges created in the batch, with their final state.
    pub created: Vec<E>,
    /// Edges deleted in the batch, with their state before the batch.
    pub deleted: Vec<E>,
    /// Property changes as `(before, after)` snapshots.
    pub changed: Vec<(E, E)>,
    /// Vertices deleted in the batch.
    pub deleted_vertices: BTreeSet<VertexId>,
}

impl<E> Default for MutationBatch<E> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            deleted: Vec::new(),
            changed: Vec::new(),
            deleted_vertices: BTreeSet::new(),
        }
    }
}

impl<E> MutationBatch<E> {
    /// Whether the batch carries no edge changes.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }
}

/// Resolves the direction of `edge` as seen from `point_of_view`.
///
/// Self-loops resolve to `default`, which must then be `Outgoing` or `Incoming`.
pub fn resolve_direction(
    edge: &dyn GraphEdge,
    point_of_view: VertexId,
    default: Direction,
) -> Result<Direction> {
    let start = edge.start_vertex();
    let end = edge.end_vertex();
    if start == point_of_view && end == point_of_view {
        if !default.is_resolved() {
            return Err(DegreeCacheError::InvalidArgument(format!(
                "self-loop {} needs a resolved default direction",
                edge.id()
            )));
        }
        return Ok(default);
    }
    if start == point_of_view {
        return Ok(Direction::Outgoing);
    }
    if end == point_of_view {
        return Ok(Direction::Incoming);
    }
    Err(DegreeCacheError::InvalidArgument(format!(
        "edge {} is not incident to vertex {point_of_view}",
        edge.id()
    )))
}
