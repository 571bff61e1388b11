//! Bounding the number of cached entries per vertex.

mod generalize;

use tracing::{debug, warn};

use crate::cache::DegreeCachingVertex;
use crate::error::Result;

pub use generalize::produce_generalization;

/// Entry cap used when none is configured.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 20;

/// Order in which `(edge type, property key)` pairs are generalized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GeneralizationOrder {
    /// Keys whose values change most often among the entries go first.
    #[default]
    ChangeFrequency,
    /// Keys go by edge type, then key name.
    KeyName,
}

/// Compaction policy: an entry-count cap and the order keys are generalized in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompactionStrategy {
    /// Maximum number of entries kept per vertex.
    pub threshold: usize,
    /// Generalization order.
    pub order: GeneralizationOrder,
}

impl Default for CompactionStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_COMPACTION_THRESHOLD)
    }
}

impl CompactionStrategy {
    /// Creates a strategy with the default order.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            order: GeneralizationOrder::default(),
        }
    }

    /// Effectively disables compaction.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }
}

/// Merges entries of `vertex` until at most `threshold` remain.
///
/// Every step replaces all entries that one generalization covers with a single entry
/// holding their sum. Returns `false` when no generalization is left and the cap could not
/// be reached.
pub fn compact(vertex: &mut DegreeCachingVertex) -> Result<bool> {
    let strategy = vertex.compaction();
    while vertex.cached_degrees().len() > strategy.threshold {
        let Some(generalization) = produce_generalization(vertex.cached_degrees(), strategy.order)
        else {
            warn!(
                vertex = %vertex.id(),
                threshold = strategy.threshold,
                entries = vertex.cached_degrees().len(),
                "relcount.compaction.threshold_unreachable"
            );
            return Ok(false);
        };

        let candidates: Vec<_> = vertex
            .cached_degrees()
            .keys()
            .filter(|description| generalization.is_more_general_than(description))
            .cloned()
            .collect();

        let mut total = 0;
        for candidate in &candidates {
            total += vertex.take_entry(candidate).unwrap_or_default();
        }
        vertex.increment_degree_with(&generalization, total, true)?;
        vertex.metrics().compaction(candidates.len());
        debug!(
            vertex = %vertex.id(),
            merged = candidates.len(),
            into = %generalization,
            "relcount.compaction.step"
        );
    }
    Ok(true)
}
