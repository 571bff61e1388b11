use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CachingScope, DegreeCache};
use crate::count::{CachedCounter, FallbackCounter, NaiveCounter};
use crate::error::Result;
use crate::graph::{
    FilteredEdge, GraphEdge, GraphView, MemoryGraph, MutationBatch, VertexPropertyStore,
};
use crate::model::{Direction, VertexId};
use crate::options::DegreeCacheOptions;

const PROGRESS_EVERY: usize = 100;

/// Keeps a degree cache in step with a graph and hands out counters over it.
///
/// Several modules with different ids can serve the same graph; each one only touches
/// vertex properties under its own prefix.
pub struct DegreeCountModule {
    options: DegreeCacheOptions,
    cache: DegreeCache,
    pending: Mutex<BTreeSet<VertexId>>,
}

impl DegreeCountModule {
    /// Creates a module, rejecting unusable options.
    pub fn new(options: DegreeCacheOptions) -> Result<Self> {
        options.validate()?;
        let cache = DegreeCache::new(&options);
        Ok(Self {
            options,
            cache,
            pending: Mutex::new(BTreeSet::new()),
        })
    }

    /// Module id.
    pub fn id(&self) -> &str {
        &self.options.id
    }

    /// Options the module was created with.
    pub fn options(&self) -> &DegreeCacheOptions {
        &self.options
    }

    /// The underlying cache.
    pub fn cache(&self) -> &DegreeCache {
        &self.cache
    }

    /// Applies one batch of edge changes to the cache.
    ///
    /// The caching scope is ended, and touched vertices flushed, whether or not handling
    /// succeeds. When the cache turns out to be out of sync, every live endpoint of the
    /// batch is recorded for [`Self::reinitialize_pending`] and the error is returned.
    pub fn before_commit<G: GraphView>(
        &self,
        graph: &mut G,
        batch: &MutationBatch<G::Edge>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut scope = self.cache.scope();
        scope.start()?;
        let handled = self.handle_batch(&mut scope, &*graph, batch);
        let ended = scope.end(graph);

        if let Err(err) = &handled {
            if err.needs_reinitialization() {
                let affected = live_endpoints(batch);
                warn!(
                    module = %self.options.id,
                    vertices = affected.len(),
                    "relcount.module.reinitialization_scheduled"
                );
                self.pending.lock().extend(affected);
            }
        }
        handled?;
        ended.map(|_| ())
    }

    /// Drains the changes pending on `graph` and applies them.
    pub fn commit(&self, graph: &mut MemoryGraph) -> Result<()> {
        let batch = graph.take_batch();
        self.before_commit(graph, &batch)
    }

    fn handle_batch<G: GraphView>(
        &self,
        scope: &mut CachingScope<'_>,
        graph: &G,
        batch: &MutationBatch<G::Edge>,
    ) -> Result<()> {
        let inclusion = &self.options.inclusion;
        let tracked = |vertex: VertexId| {
            !batch.deleted_vertices.contains(&vertex) && inclusion.include_vertex(vertex)
        };

        for edge in &batch.created {
            if inclusion.include_edge(edge) {
                let filtered = FilteredEdge::new(edge, inclusion);
                self.apply(scope, graph, &filtered, true, &tracked)?;
            }
        }
        for edge in &batch.deleted {
            if inclusion.include_edge(edge) {
                let filtered = FilteredEdge::new(edge, inclusion);
                self.apply(scope, graph, &filtered, false, &tracked)?;
            }
        }
        for (previous, current) in &batch.changed {
            let previous_included = inclusion.include_edge(previous);
            let current_included = inclusion.include_edge(current);
            let previous = FilteredEdge::new(previous, inclusion);
            let current = FilteredEdge::new(current, inclusion);
            if previous_included && current_included {
                let both_tracked = tracked(previous.start_vertex()) && tracked(previous.end_vertex());
                if both_tracked {
                    scope.handle_changed_edge(graph, &previous, &current)?;
                    continue;
                }
            }
            if previous_included {
                self.apply(scope, graph, &previous, false, &tracked)?;
            }
            if current_included {
                self.apply(scope, graph, &current, true, &tracked)?;
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        scope: &mut CachingScope<'_>,
        store: &dyn VertexPropertyStore,
        edge: &dyn GraphEdge,
        created: bool,
        tracked: &dyn Fn(VertexId) -> bool,
    ) -> Result<()> {
        let endpoints = [
            (edge.start_vertex(), Direction::Incoming),
            (edge.end_vertex(), Direction::Outgoing),
        ];
        for (vertex, default) in endpoints {
            if !tracked(vertex) {
                continue;
            }
            if created {
                scope.handle_created_edge(store, edge, vertex, default)?;
            } else {
                scope.handle_deleted_edge(store, edge, vertex, default)?;
            }
        }
        Ok(())
    }

    /// Records every included edge of `vertex` in the cache, on top of what is already
    /// cached. Self-loops are recorded as both outgoing and incoming.
    pub fn build_cached_counts<G: GraphView>(&self, graph: &mut G, vertex: VertexId) -> Result<()> {
        let inclusion = &self.options.inclusion;
        if !inclusion.include_vertex(vertex) {
            return Ok(());
        }
        let edges = graph.edges_of(vertex, Direction::Both, None)?;
        let mut scope = self.cache.scope();
        scope.start()?;
        let mut handled = Ok(());
        for edge in edges.iter().filter(|edge| inclusion.include_edge(*edge)) {
            let filtered = FilteredEdge::new(edge, inclusion);
            handled = scope
                .handle_created_edge(&*graph, &filtered, vertex, Direction::Outgoing)
                .and_then(|_| {
                    if edge.is_self_loop() {
                        scope.handle_created_edge(&*graph, &filtered, vertex, Direction::Incoming)
                    } else {
                        Ok(())
                    }
                });
            if handled.is_err() {
                break;
            }
        }
        let ended = scope.end(graph);
        handled?;
        ended.map(|_| ())
    }

    /// Removes every cached entry of `vertex` written by this module.
    pub fn clear_cached_counts<G: GraphView>(&self, graph: &mut G, vertex: VertexId) -> Result<()> {
        self.cache.clear_entries(graph, vertex)
    }

    /// Builds cached counts for every vertex. Returns the number of vertices visited.
    pub fn initialize<G: GraphView>(&self, graph: &mut G) -> Result<usize> {
        let vertices = graph.vertex_ids();
        for (done, vertex) in vertices.iter().enumerate() {
            self.build_cached_counts(graph, *vertex)?;
            if (done + 1) % PROGRESS_EVERY == 0 {
                debug!(module = %self.options.id, done = done + 1, total = vertices.len(), "relcount.module.build_progress");
            }
        }
        info!(module = %self.options.id, vertices = vertices.len(), "relcount.module.initialized");
        Ok(vertices.len())
    }

    /// Clears and rebuilds the cached counts of every vertex.
    pub fn reinitialize<G: GraphView>(&self, graph: &mut G) -> Result<usize> {
        for vertex in graph.vertex_ids() {
            self.clear_cached_counts(graph, vertex)?;
        }
        self.pending.lock().clear();
        self.initialize(graph)
    }

    /// Clears and rebuilds the vertices recorded by a failed [`Self::before_commit`].
    /// Returns the number of vertices rebuilt.
    pub fn reinitialize_pending<G: GraphView>(&self, graph: &mut G) -> Result<usize> {
        let pending = std::mem::take(&mut *self.pending.lock());
        let mut rebuilt = 0;
        for vertex in pending {
            if !graph.contains_vertex(vertex) {
                continue;
            }
            self.clear_cached_counts(graph, vertex)?;
            self.build_cached_counts(graph, vertex)?;
            rebuilt += 1;
        }
        if rebuilt > 0 {
            info!(module = %self.options.id, rebuilt, "relcount.module.reinitialized_pending");
        }
        Ok(rebuilt)
    }

    /// Vertices waiting for reinitialization.
    pub fn needs_reinitialization(&self) -> BTreeSet<VertexId> {
        self.pending.lock().clone()
    }

    /// Counter scanning the graph.
    pub fn naive_counter(&self) -> NaiveCounter {
        NaiveCounter::new(
            self.options.weighing.clone(),
            self.options.inclusion.clone(),
        )
    }

    /// Counter reading this module's cache; fails where compaction lost precision.
    pub fn cached_counter(&self) -> CachedCounter {
        CachedCounter::new(self.cache.clone())
    }

    /// Counter reading this module's cache and scanning where compaction lost precision.
    pub fn fallback_counter(&self) -> FallbackCounter {
        FallbackCounter::new(
            self.cached_counter(),
            self.naive_counter(),
            self.options.metrics.clone(),
        )
    }
}

fn live_endpoints<E: GraphEdge>(batch: &MutationBatch<E>) -> BTreeSet<VertexId> {
    let created = batch.created.iter();
    let deleted = batch.deleted.iter();
    let changed = batch.changed.iter().map(|(_, current)| current);
    created
        .chain(deleted)
        .chain(changed)
        .flat_map(|edge| [edge.start_vertex(), edge.end_vertex()])
        .filter(|vertex| !batch.deleted_vertices.contains(vertex))
        .collect()
}

impl std::fmt::Debug for DegreeCountModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegreeCountModule")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl From<&DegreeCountModule> for DegreeCacheOptions {
    fn from(module: &DegreeCountModule) -> Self {
        module.options.clone()
    }
}
