use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::error::{DegreeCacheError, Result};
use crate::model::{Direction, EdgeId, PropertyValue, VertexId};

use super::{GraphEdge, GraphView, MutationBatch, PropertyContainer, VertexPropertyStore};

/// Edge record of [`MemoryGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEdge {
    /// Edge identity.
    pub id: EdgeId,
    /// Start vertex.
    pub start: VertexId,
    /// End vertex.
    pub end: VertexId,
    /// Relationship type.
    pub edge_type: String,
    /// Edge properties.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl MemoryEdge {
    /// Creates an edge without properties.
    pub fn new(id: EdgeId, start: VertexId, end: VertexId, edge_type: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            edge_type: edge_type.into(),
            properties: BTreeMap::new(),
        }
    }
}

impl PropertyContainer for MemoryEdge {
    fn property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.get(key).cloned()
    }

    fn property_keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }
}

impl GraphEdge for MemoryEdge {
    fn id(&self) -> EdgeId {
        self.id
    }

    fn edge_type(&self) -> &str {
        &self.edge_type
    }

    fn start_vertex(&self) -> VertexId {
        self.start
    }

    fn end_vertex(&self) -> VertexId {
        self.end
    }
}

#[derive(Debug, Default)]
struct VertexRecord {
    properties: BTreeMap<String, PropertyValue>,
    outgoing: BTreeSet<EdgeId>,
    incoming: BTreeSet<EdgeId>,
}

#[derive(Debug, Default)]
struct PendingBatch {
    created: BTreeSet<EdgeId>,
    before: BTreeMap<EdgeId, MemoryEdge>,
    deleted_vertices: BTreeSet<VertexId>,
}

/// In-memory graph that records the edge changes of the current batch.
///
/// Edge mutations accumulate until [`MemoryGraph::take_batch`] turns them into a
/// [`MutationBatch`]: an edge created and changed in the same batch is reported as created
/// with its final state, created then deleted is not reported, and changed edges are
/// reported against their state at the start of the batch. Vertex property writes are not
/// tracked.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    next_vertex: u64,
    next_edge: u64,
    vertices: BTreeMap<VertexId, VertexRecord>,
    edges: BTreeMap<EdgeId, MemoryEdge>,
    pending: PendingBatch,
}

impl MemoryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vertex with the given properties.
    pub fn create_vertex(&mut self, properties: BTreeMap<String, PropertyValue>) -> VertexId {
        self.next_vertex += 1;
        let id = VertexId(self.next_vertex);
        self.vertices.insert(
            id,
            VertexRecord {
                properties,
                ..VertexRecord::default()
            },
        );
        id
    }

    /// Creates a vertex with a caller-chosen identity, used when importing external data.
    pub fn ensure_vertex(&mut self, id: VertexId) -> VertexId {
        self.next_vertex = self.next_vertex.max(id.0);
        self.vertices.entry(id).or_default();
        id
    }

    /// Creates an edge between two existing vertices.
    pub fn create_edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        edge_type: impl Into<String>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<EdgeId> {
        if !self.vertices.contains_key(&start) || !self.vertices.contains_key(&end) {
            return Err(DegreeCacheError::NotFound("vertex"));
        }
        self.next_edge += 1;
        let id = EdgeId(self.next_edge);
        let mut edge = MemoryEdge::new(id, start, end, edge_type);
        edge.properties = properties;
        if let Some(record) = self.vertices.get_mut(&start) {
            record.outgoing.insert(id);
        }
        if let Some(record) = self.vertices.get_mut(&end) {
            record.incoming.insert(id);
        }
        trace!(edge = %id, start = %start, end = %end, "relcount.graph.edge_created");
        self.edges.insert(id, edge);
        self.pending.created.insert(id);
        Ok(id)
    }

    /// Current state of an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&MemoryEdge> {
        self.edges.get(&id)
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Deletes an edge.
    pub fn delete_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self
            .edges
            .remove(&id)
            .ok_or(DegreeCacheError::NotFound("edge"))?;
        if let Some(record) = self.vertices.get_mut(&edge.start) {
            record.outgoing.remove(&id);
        }
        if let Some(record) = self.vertices.get_mut(&edge.end) {
            record.incoming.remove(&id);
        }
        if !self.pending.created.remove(&id) {
            self.pending.before.entry(id).or_insert(edge);
        }
        Ok(())
    }

    /// Sets an edge property.
    pub fn set_edge_property(
        &mut self,
        id: EdgeId,
        key: impl Into<String>,
        value: PropertyValue,
    ) -> Result<()> {
        self.remember_before(id)?;
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.properties.insert(key.into(), value);
        }
        Ok(())
    }

    /// Removes an edge property.
    pub fn remove_edge_property(&mut self, id: EdgeId, key: &str) -> Result<()> {
        self.remember_before(id)?;
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.properties.remove(key);
        }
        Ok(())
    }

    /// Deletes a vertex together with its incident edges.
    pub fn delete_vertex(&mut self, id: VertexId) -> Result<()> {
        let record = self
            .vertices
            .get(&id)
            .ok_or(DegreeCacheError::NotFound("vertex"))?;
        let incident: BTreeSet<EdgeId> = record.outgoing.union(&record.incoming).copied().collect();
        for edge in incident {
            self.delete_edge(edge)?;
        }
        self.vertices.remove(&id);
        self.pending.deleted_vertices.insert(id);
        Ok(())
    }

    /// Drains the changes recorded since the previous call.
    pub fn take_batch(&mut self) -> MutationBatch<MemoryEdge> {
        let pending = std::mem::take(&mut self.pending);
        let mut batch = MutationBatch {
            deleted_vertices: pending.deleted_vertices,
            ..MutationBatch::default()
        };
        for id in pending.created {
            if let Some(edge) = self.edges.get(&id) {
                batch.created.push(edge.clone());
            }
        }
        for (id, before) in pending.before {
            match self.edges.get(&id) {
                Some(current) if *current != before => {
                    batch.changed.push((before, current.clone()))
                }
                Some(_) => {}
                None => batch.deleted.push(before),
            }
        }
        batch
    }

    fn remember_before(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.edges.get(&id).ok_or(DegreeCacheError::NotFound("edge"))?;
        if !self.pending.created.contains(&id) && !self.pending.before.contains_key(&id) {
            self.pending.before.insert(id, edge.clone());
        }
        Ok(())
    }

    fn record(&self, vertex: VertexId) -> Result<&VertexRecord> {
        self.vertices
            .get(&vertex)
            .ok_or(DegreeCacheError::NotFound("vertex"))
    }
}

impl VertexPropertyStore for MemoryGraph {
    fn vertex_property(&self, vertex: VertexId, key: &str) -> Result<Option<PropertyValue>> {
        Ok(self.record(vertex)?.properties.get(key).cloned())
    }

    fn vertex_property_keys(&self, vertex: VertexId) -> Result<Vec<String>> {
        Ok(self.record(vertex)?.properties.keys().cloned().collect())
    }

    fn set_vertex_property(
        &mut self,
        vertex: VertexId,
        key: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let record = self
            .vertices
            .get_mut(&vertex)
            .ok_or(DegreeCacheError::NotFound("vertex"))?;
        record.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_vertex_property(&mut self, vertex: VertexId, key: &str) -> Result<()> {
        let record = self
            .vertices
            .get_mut(&vertex)
            .ok_or(DegreeCacheError::NotFound("vertex"))?;
        record.properties.remove(key);
        Ok(())
    }
}

impl GraphView for MemoryGraph {
    type Edge = MemoryEdge;

    fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.keys().copied().collect()
    }

    fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.contains_key(&vertex)
    }

    fn edges_of(
        &self,
        vertex: VertexId,
        direction: Direction,
        edge_type: Option<&str>,
    ) -> Result<Vec<MemoryEdge>> {
        let record = self.record(vertex)?;
        let ids: BTreeSet<EdgeId> = match direction {
            Direction::Outgoing => record.outgoing.clone(),
            Direction::Incoming => record.incoming.clone(),
            Direction::Both => record.outgoing.union(&record.incoming).copied().collect(),
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| self.edges.get(&id))
            .filter(|edge| edge_type.map_or(true, |t| edge.edge_type == t))
            .cloned()
            .collect())
    }
}
