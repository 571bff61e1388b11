use std::fmt;
use std::sync::Arc;

use crate::model::{EdgeId, PropertyValue, VertexId};

use super::{GraphEdge, PropertyContainer};

type VertexPredicate = Arc<dyn Fn(VertexId) -> bool + Send + Sync>;
type EdgePredicate = Arc<dyn Fn(&dyn GraphEdge) -> bool + Send + Sync>;
type KeyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides which vertices, edges and edge properties the degree cache sees.
///
/// The default includes every vertex and edge and hides edge properties whose key starts
/// with `__`.
#[derive(Clone)]
pub struct InclusionPolicies {
    vertices: VertexPredicate,
    edges: EdgePredicate,
    edge_properties: KeyPredicate,
}

impl Default for InclusionPolicies {
    fn default() -> Self {
        Self {
            vertices: Arc::new(|_| true),
            edges: Arc::new(|_| true),
            edge_properties: Arc::new(|key| !key.starts_with("__")),
        }
    }
}

impl fmt::Debug for InclusionPolicies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InclusionPolicies").finish_non_exhaustive()
    }
}

impl InclusionPolicies {
    /// Default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the vertices whose degrees are cached.
    pub fn with_vertices(mut self, f: impl Fn(VertexId) -> bool + Send + Sync + 'static) -> Self {
        self.vertices = Arc::new(f);
        self
    }

    /// Restricts the edges that are counted.
    pub fn with_edges(
        mut self,
        f: impl Fn(&dyn GraphEdge) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.edges = Arc::new(f);
        self
    }

    /// Restricts the edge properties that take part in descriptions.
    pub fn with_edge_properties(
        mut self,
        f: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.edge_properties = Arc::new(f);
        self
    }

    /// Whether the vertex is tracked.
    pub fn include_vertex(&self, vertex: VertexId) -> bool {
        (self.vertices)(vertex)
    }

    /// Whether the edge is counted.
    pub fn include_edge(&self, edge: &dyn GraphEdge) -> bool {
        (self.edges)(edge)
    }

    /// Whether an edge property key is visible.
    pub fn include_edge_property(&self, key: &str) -> bool {
        (self.edge_properties)(key)
    }
}

/// An edge whose properties are filtered through [`InclusionPolicies`].
pub struct FilteredEdge<'a> {
    inner: &'a dyn GraphEdge,
    policies: &'a InclusionPolicies,
}

impl<'a> FilteredEdge<'a> {
    /// Wraps `inner`.
    pub fn new(inner: &'a dyn GraphEdge, policies: &'a InclusionPolicies) -> Self {
        Self { inner, policies }
    }

    /// The unfiltered edge.
    pub fn inner(&self) -> &'a dyn GraphEdge {
        self.inner
    }
}

impl PropertyContainer for FilteredEdge<'_> {
    fn property(&self, key: &str) -> Option<PropertyValue> {
        if !self.policies.include_edge_property(key) {
            return None;
        }
        self.inner.property(key)
    }

    fn property_keys(&self) -> Vec<String> {
        self.inner
            .property_keys()
            .into_iter()
            .filter(|key| self.policies.include_edge_property(key))
            .collect()
    }
}

impl GraphEdge for FilteredEdge<'_> {
    fn id(&self) -> EdgeId {
        self.inner.id()
    }

    fn edge_type(&self) -> &str {
        self.inner.edge_type()
    }

    fn start_vertex(&self) -> VertexId {
        self.inner.start_vertex()
    }

    fn end_vertex(&self) -> VertexId {
        self.inner.end_vertex()
    }

    fn unfiltered(&self) -> Option<&dyn GraphEdge> {
        Some(self.inner)
    }
}
