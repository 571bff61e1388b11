use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::compact::{self, CompactionStrategy};
use crate::description::DetachedEdgeDescription;
use crate::error::{DegreeCacheError, Result};
use crate::graph::VertexPropertyStore;
use crate::metrics::DegreeMetrics;
use crate::model::VertexId;

use super::persistence::DegreePersistence;

/// In-memory cached degrees of one vertex, with the changes made since they were read.
///
/// Entries form an antichain: no entry is more general than another, so every described
/// edge accumulates into at most one entry.
pub struct DegreeCachingVertex {
    id: VertexId,
    prefix: String,
    entries: BTreeMap<DetachedEdgeDescription, i64>,
    updated: BTreeSet<DetachedEdgeDescription>,
    removed: BTreeSet<DetachedEdgeDescription>,
    compaction: CompactionStrategy,
    metrics: Arc<dyn DegreeMetrics>,
}

impl DegreeCachingVertex {
    /// Creates a vertex cache holding `entries`.
    pub fn new(
        id: VertexId,
        prefix: impl Into<String>,
        entries: BTreeMap<DetachedEdgeDescription, i64>,
        compaction: CompactionStrategy,
        metrics: Arc<dyn DegreeMetrics>,
    ) -> Self {
        Self {
            id,
            prefix: prefix.into(),
            entries,
            updated: BTreeSet::new(),
            removed: BTreeSet::new(),
            compaction,
            metrics,
        }
    }

    /// Reads the persisted entries of `id`.
    pub fn load(
        store: &dyn VertexPropertyStore,
        id: VertexId,
        prefix: &str,
        persistence: &dyn DegreePersistence,
        lenient: bool,
        compaction: CompactionStrategy,
        metrics: Arc<dyn DegreeMetrics>,
    ) -> Result<Self> {
        let entries = persistence.read_entries(store, id, prefix, lenient)?;
        Ok(Self::new(id, prefix, entries, compaction, metrics))
    }

    /// Vertex identity.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Current entries.
    pub fn cached_degrees(&self) -> &BTreeMap<DetachedEdgeDescription, i64> {
        &self.entries
    }

    /// Whether anything changed since the entries were read or last flushed.
    pub fn is_dirty(&self) -> bool {
        !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Adds `delta` to the entry covering `description`, then compacts.
    pub fn increment_degree(&mut self, description: &DetachedEdgeDescription, delta: i64) -> Result<()> {
        self.increment_degree_with(description, delta, false)
    }

    /// Adds `delta` to the entry covering `description`, creating an entry for exactly
    /// `description` when none does. Compaction runs afterwards unless prevented.
    ///
    /// A zero delta changes nothing; a negative one is rejected.
    pub fn increment_degree_with(
        &mut self,
        description: &DetachedEdgeDescription,
        delta: i64,
        prevent_compaction: bool,
    ) -> Result<()> {
        self.check_resolved(description)?;
        if check_delta(delta)? {
            return Ok(());
        }
        if let Some(covering) = self.covering_entry(description) {
            let degree = self.entries.get(&covering).copied().unwrap_or_default() + delta;
            trace!(vertex = %self.id, entry = %covering, degree, "relcount.vertex.increment");
            self.put(covering, degree);
            return Ok(());
        }

        trace!(vertex = %self.id, entry = %description, degree = delta, "relcount.vertex.insert");
        self.put(description.clone(), delta);
        if !prevent_compaction {
            compact::compact(self)?;
        }
        Ok(())
    }

    /// Subtracts `delta` from the entry covering `description`, dropping it at zero.
    ///
    /// A negative result or a missing entry means the cache diverged from the graph and
    /// yields [`DegreeCacheError::NeedsReinitialization`].
    pub fn decrement_degree(&mut self, description: &DetachedEdgeDescription, delta: i64) -> Result<()> {
        self.check_resolved(description)?;
        if check_delta(delta)? {
            return Ok(());
        }
        let Some(covering) = self.covering_entry(description) else {
            return Err(DegreeCacheError::out_of_sync(
                self.id,
                format!("{description} was not present"),
            ));
        };

        let degree = self.entries.get(&covering).copied().unwrap_or_default() - delta;
        trace!(vertex = %self.id, entry = %covering, degree, "relcount.vertex.decrement");
        if degree > 0 {
            self.put(covering, degree);
            return Ok(());
        }
        self.delete(covering.clone());
        if degree < 0 {
            return Err(DegreeCacheError::out_of_sync(
                self.id,
                format!("{covering} was out of sync"),
            ));
        }
        Ok(())
    }

    /// Writes pending changes through `persistence`. Returns whether anything was written.
    pub fn flush(
        &mut self,
        store: &mut dyn VertexPropertyStore,
        persistence: &dyn DegreePersistence,
    ) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        persistence.write_entries(
            store,
            self.id,
            &self.prefix,
            &self.entries,
            &self.updated,
            &self.removed,
        )?;
        debug!(
            vertex = %self.id,
            entries = self.entries.len(),
            updated = self.updated.len(),
            removed = self.removed.len(),
            "relcount.vertex.flushed"
        );
        self.updated.clear();
        self.removed.clear();
        self.metrics.flush();
        Ok(true)
    }

    pub(crate) fn compaction(&self) -> CompactionStrategy {
        self.compaction
    }

    pub(crate) fn metrics(&self) -> &dyn DegreeMetrics {
        self.metrics.as_ref()
    }

    /// Removes an entry outright, returning its degree.
    pub(crate) fn take_entry(&mut self, description: &DetachedEdgeDescription) -> Option<i64> {
        let degree = self.entries.get(description).copied()?;
        self.delete(description.clone());
        Some(degree)
    }

    fn covering_entry(&self, description: &DetachedEdgeDescription) -> Option<DetachedEdgeDescription> {
        self.entries
            .keys()
            .find(|cached| cached.is_more_general_than(description))
            .cloned()
    }

    fn check_resolved(&self, description: &DetachedEdgeDescription) -> Result<()> {
        if description.direction().is_resolved() {
            return Ok(());
        }
        Err(DegreeCacheError::InvalidArgument(format!(
            "cached description {description} must have a resolved direction"
        )))
    }

    fn put(&mut self, description: DetachedEdgeDescription, degree: i64) {
        self.removed.remove(&description);
        self.updated.insert(description.clone());
        self.entries.insert(description, degree);
    }

    fn delete(&mut self, description: DetachedEdgeDescription) {
        self.entries.remove(&description);
        self.updated.remove(&description);
        self.removed.insert(description);
    }
}

/// Returns whether `delta` is zero, failing when it is negative.
fn check_delta(delta: i64) -> Result<bool> {
    if delta < 0 {
        return Err(DegreeCacheError::InvalidArgument(format!(
            "degree delta must not be negative, got {delta}"
        )));
    }
    Ok(delta == 0)
}
