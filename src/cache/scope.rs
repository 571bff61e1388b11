use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::compact::CompactionStrategy;
use crate::description::DetachedEdgeDescription;
use crate::error::{DegreeCacheError, Result};
use crate::graph::{resolve_direction, GraphEdge, VertexPropertyStore};
use crate::metrics::DegreeMetrics;
use crate::model::{Direction, VertexId};
use crate::options::DegreeCacheOptions;
use crate::weigh::{checked_weight, WeighingStrategy};

use super::persistence::DegreePersistence;
use super::vertex::DegreeCachingVertex;

/// Turns edge events into per-vertex degree updates.
///
/// Updates happen inside a [`CachingScope`] obtained from [`DegreeCache::scope`]; each
/// touched vertex is read once and written once per scope.
#[derive(Clone)]
pub struct DegreeCache {
    prefix: String,
    compaction: CompactionStrategy,
    persistence: Arc<dyn DegreePersistence>,
    lenient: bool,
    weighing: Arc<dyn WeighingStrategy>,
    metrics: Arc<dyn DegreeMetrics>,
}

impl DegreeCache {
    /// Creates a cache from module options.
    pub fn new(options: &DegreeCacheOptions) -> Self {
        Self {
            prefix: options.prefix(),
            compaction: options.compaction,
            persistence: Arc::clone(&options.persistence),
            lenient: options.lenient,
            weighing: Arc::clone(&options.weighing),
            metrics: Arc::clone(&options.metrics),
        }
    }

    /// Vertex property prefix of this cache.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Persistence strategy.
    pub fn persistence(&self) -> &dyn DegreePersistence {
        self.persistence.as_ref()
    }

    /// Reads the persisted entries of `vertex`.
    pub fn read_entries(
        &self,
        store: &dyn VertexPropertyStore,
        vertex: VertexId,
    ) -> Result<BTreeMap<DetachedEdgeDescription, i64>> {
        self.persistence
            .read_entries(store, vertex, &self.prefix, self.lenient)
    }

    pub(crate) fn metrics(&self) -> &dyn DegreeMetrics {
        self.metrics.as_ref()
    }

    /// Removes every persisted entry of `vertex`.
    pub fn clear_entries(&self, store: &mut dyn VertexPropertyStore, vertex: VertexId) -> Result<()> {
        self.persistence.clear_entries(store, vertex, &self.prefix)
    }

    /// Creates an inactive scope.
    pub fn scope(&self) -> CachingScope<'_> {
        CachingScope {
            cache: self,
            vertices: None,
        }
    }

    fn load_vertex(
        &self,
        store: &dyn VertexPropertyStore,
        vertex: VertexId,
    ) -> Result<DegreeCachingVertex> {
        DegreeCachingVertex::load(
            store,
            vertex,
            &self.prefix,
            self.persistence.as_ref(),
            self.lenient,
            self.compaction,
            Arc::clone(&self.metrics),
        )
    }
}

/// One mutation batch worth of cached vertices.
///
/// `start` and `end` bracket the batch. `end` flushes every touched vertex exactly once and
/// leaves the scope inactive even when a flush fails.
pub struct CachingScope<'c> {
    cache: &'c DegreeCache,
    vertices: Option<BTreeMap<VertexId, DegreeCachingVertex>>,
}

impl CachingScope<'_> {
    /// Activates the scope.
    pub fn start(&mut self) -> Result<()> {
        if self.vertices.is_some() {
            return Err(DegreeCacheError::IllegalScope("caching scope already started"));
        }
        self.vertices = Some(BTreeMap::new());
        Ok(())
    }

    /// Whether the scope is between `start` and `end`.
    pub fn is_active(&self) -> bool {
        self.vertices.is_some()
    }

    /// Records a new edge on `point_of_view`.
    ///
    /// `default_direction` applies to self-loops and must be resolved.
    pub fn handle_created_edge(
        &mut self,
        store: &dyn VertexPropertyStore,
        edge: &dyn GraphEdge,
        point_of_view: VertexId,
        default_direction: Direction,
    ) -> Result<()> {
        let (description, weight) = self.describe(edge, point_of_view, default_direction)?;
        trace!(edge = %edge.id(), vertex = %point_of_view, weight, "relcount.scope.created");
        self.vertex(store, point_of_view)?
            .increment_degree(&description, weight)
    }

    /// Records the removal of an edge from `point_of_view`.
    pub fn handle_deleted_edge(
        &mut self,
        store: &dyn VertexPropertyStore,
        edge: &dyn GraphEdge,
        point_of_view: VertexId,
        default_direction: Direction,
    ) -> Result<()> {
        let (description, weight) = self.describe(edge, point_of_view, default_direction)?;
        trace!(edge = %edge.id(), vertex = %point_of_view, weight, "relcount.scope.deleted");
        self.vertex(store, point_of_view)?
            .decrement_degree(&description, weight)
    }

    /// Records a property change as a deletion of `previous` plus a creation of `current`
    /// on both endpoints.
    pub fn handle_changed_edge(
        &mut self,
        store: &dyn VertexPropertyStore,
        previous: &dyn GraphEdge,
        current: &dyn GraphEdge,
    ) -> Result<()> {
        self.handle_deleted_edge(store, previous, previous.start_vertex(), Direction::Incoming)?;
        self.handle_deleted_edge(store, previous, previous.end_vertex(), Direction::Outgoing)?;
        self.handle_created_edge(store, current, current.start_vertex(), Direction::Incoming)?;
        self.handle_created_edge(store, current, current.end_vertex(), Direction::Outgoing)
    }

    /// Flushes every touched vertex and deactivates the scope.
    ///
    /// Returns the number of vertices written, or the first flush error after attempting
    /// all of them.
    pub fn end(&mut self, store: &mut dyn VertexPropertyStore) -> Result<usize> {
        let vertices = self
            .vertices
            .take()
            .ok_or(DegreeCacheError::IllegalScope("caching scope not started"))?;
        let mut flushed = 0;
        let mut first_error = None;
        for (id, mut vertex) in vertices {
            match vertex.flush(store, self.cache.persistence()) {
                Ok(true) => flushed += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(vertex = %id, error = %err, "relcount.scope.flush_failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        debug!(flushed, "relcount.scope.ended");
        match first_error {
            Some(err) => Err(err),
            None => Ok(flushed),
        }
    }

    fn describe(
        &self,
        edge: &dyn GraphEdge,
        point_of_view: VertexId,
        default_direction: Direction,
    ) -> Result<(DetachedEdgeDescription, i64)> {
        if !default_direction.is_resolved() {
            return Err(DegreeCacheError::InvalidArgument(
                "default direction must be Outgoing or Incoming".into(),
            ));
        }
        let direction = resolve_direction(edge, point_of_view, default_direction)?;
        let weight = checked_weight(self.cache.weighing.as_ref(), edge, point_of_view)?;
        Ok((DetachedEdgeDescription::of_edge(edge, direction), weight))
    }

    fn vertex(
        &mut self,
        store: &dyn VertexPropertyStore,
        id: VertexId,
    ) -> Result<&mut DegreeCachingVertex> {
        let cache = self.cache;
        let vertices = self
            .vertices
            .as_mut()
            .ok_or(DegreeCacheError::IllegalScope("caching scope not started"))?;
        if !vertices.contains_key(&id) {
            vertices.insert(id, cache.load_vertex(store, id)?);
        }
        vertices
            .get_mut(&id)
            .ok_or(DegreeCacheError::NotFound("cached vertex"))
    }
}

impl Drop for CachingScope<'_> {
    fn drop(&mut self) {
        if let Some(vertices) = &self.vertices {
            warn!(
                touched = vertices.len(),
                "relcount.scope.dropped_while_active"
            );
        }
    }
}
