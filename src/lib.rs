//! Incremental degree cache for property graphs.
//!
//! Each vertex keeps a small map from edge descriptions (type, direction and property
//! predicates) to the weighted number of edges they describe. The map is maintained as
//! edges are created, changed and deleted, compacted into more general descriptions when
//! it grows past a threshold, and queried by three counters:
//!
//! * [`NaiveCounter`] scans the live edges of the vertex.
//! * [`CachedCounter`] answers from the cache and fails when compaction lost precision.
//! * [`FallbackCounter`] answers from the cache and scans when the cache cannot answer.
//!
//! ```
//! use std::collections::BTreeMap;
//! use sombra_relcount::{
//!     DegreeCacheOptions, DegreeCountModule, DegreeCounter, DetachedEdgeDescription, Direction,
//!     MemoryGraph, PropertyPredicate,
//! };
//!
//! let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
//! let mut graph = MemoryGraph::new();
//! let alice = graph.create_vertex(BTreeMap::new());
//! let bob = graph.create_vertex(BTreeMap::new());
//! let since = BTreeMap::from([("since".to_string(), 2020.into())]);
//! graph.create_edge(alice, bob, "FRIEND", since).unwrap();
//! module.commit(&mut graph).unwrap();
//!
//! let query = DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
//!     .with("since", PropertyPredicate::equal_to(2020));
//! assert_eq!(module.cached_counter().count(&graph, alice, &query).unwrap(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod compact;
pub mod count;
pub mod data_generator;
pub mod description;
pub mod error;
pub mod graph;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod module;
pub mod options;
pub mod weigh;

pub use cache::{CachingScope, DegreeCache, DegreeCachingVertex, DegreePersistence, PropertyPerEntry, SingleBlob};
pub use compact::{CompactionStrategy, GeneralizationOrder};
pub use count::{CachedCounter, DegreeCounter, FallbackCounter, NaiveCounter};
pub use description::{
    AbsentKeys, DetachedEdgeDescription, DetachedPropertiesDescription, LazyPropertiesDescription,
    PropertiesDescription, PropertyPredicate,
};
pub use error::{DegreeCacheError, Result};
pub use graph::{
    GraphEdge, GraphView, InclusionPolicies, MemoryEdge, MemoryGraph, MutationBatch,
    PropertyContainer, VertexPropertyStore,
};
pub use metrics::{CounterMetrics, DegreeMetrics, NoopMetrics};
pub use model::{Direction, EdgeId, PropertyValue, VertexId};
pub use module::DegreeCountModule;
pub use options::{DegreeCacheConfig, DegreeCacheOptions};
pub use weigh::{OneForEach, PropertyWeight, WeighingStrategy};
