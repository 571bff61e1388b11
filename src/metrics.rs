use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sink for degree cache statistics.
///
/// Direction labels are `"out"`, `"in"` or `"both"`.
pub trait DegreeMetrics: Send + Sync {
    /// A cached count answered a query exactly.
    fn cached_answer(&self, direction: &'static str);

    /// A cached count could not answer because compaction merged the required entries.
    fn unable_to_count(&self, direction: &'static str);

    /// The fallback counter scanned the graph instead of using the cache.
    fn fallback(&self);

    /// One compaction step merged `merged` entries into a generalization.
    fn compaction(&self, merged: usize);

    /// A vertex's entries were written back to storage.
    fn flush(&self);
}

/// Discards every recorded metric.
#[derive(Default)]
pub struct NoopMetrics;

impl DegreeMetrics for NoopMetrics {
    fn cached_answer(&self, _direction: &'static str) {}
    fn unable_to_count(&self, _direction: &'static str) {}
    fn fallback(&self) {}
    fn compaction(&self, _merged: usize) {}
    fn flush(&self) {}
}

/// Thread-safe atomic counters.
#[derive(Default)]
pub struct CounterMetrics {
    /// Outgoing queries answered from the cache.
    pub cached_answers_out: AtomicU64,

    /// Incoming queries answered from the cache.
    pub cached_answers_in: AtomicU64,

    /// Queries in both directions answered from the cache.
    pub cached_answers_both: AtomicU64,

    /// Cached queries that hit a compacted entry.
    pub unable_to_count: AtomicU64,

    /// Fallback scans.
    pub fallbacks: AtomicU64,

    /// Compaction steps.
    pub compactions: AtomicU64,

    /// Entries absorbed by compaction steps.
    pub compacted_entries: AtomicU64,

    /// Vertex flushes.
    pub flushes: AtomicU64,
}

impl CounterMetrics {
    /// Sum of cached answers over all directions.
    pub fn cached_answers(&self) -> u64 {
        self.cached_answers_out.load(Ordering::Relaxed)
            + self.cached_answers_in.load(Ordering::Relaxed)
            + self.cached_answers_both.load(Ordering::Relaxed)
    }
}

impl DegreeMetrics for CounterMetrics {
    fn cached_answer(&self, direction: &'static str) {
        match direction {
            "out" => {
                self.cached_answers_out.fetch_add(1, Ordering::Relaxed);
            }
            "in" => {
                self.cached_answers_in.fetch_add(1, Ordering::Relaxed);
            }
            "both" => {
                self.cached_answers_both.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn unable_to_count(&self, _direction: &'static str) {
        self.unable_to_count.fetch_add(1, Ordering::Relaxed);
    }

    fn fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn compaction(&self, merged: usize) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.compacted_entries
            .fetch_add(merged as u64, Ordering::Relaxed);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Default sink, a [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn DegreeMetrics> {
    Arc::new(NoopMetrics)
}
