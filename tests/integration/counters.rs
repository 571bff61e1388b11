#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sombra_relcount::{
    CounterMetrics, DegreeCacheError, DegreeCacheOptions, DegreeCountModule, DegreeCounter,
    DetachedEdgeDescription, Direction, MemoryGraph, PropertyPredicate, PropertyValue,
    PropertyWeight, VertexId, VertexPropertyStore,
};

fn since(year: i64) -> BTreeMap<String, PropertyValue> {
    BTreeMap::from([("since".to_string(), PropertyValue::Int(year))])
}

fn friend_since(year: i64) -> DetachedEdgeDescription {
    DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
        .with("since", PropertyPredicate::equal_to(year))
}

struct Fixture {
    graph: MemoryGraph,
    module: DegreeCountModule,
    metrics: Arc<CounterMetrics>,
    alice: VertexId,
}

fn fixture(threshold: usize, years: &[i64]) -> Fixture {
    let metrics = Arc::new(CounterMetrics::default());
    let module = DegreeCountModule::new(
        DegreeCacheOptions::new()
            .compaction_threshold(threshold)
            .metrics(metrics.clone()),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let alice = graph.create_vertex(BTreeMap::new());
    for &year in years {
        let friend = graph.create_vertex(BTreeMap::new());
        graph.create_edge(alice, friend, "FRIEND", since(year)).unwrap();
    }
    module.commit(&mut graph).unwrap();
    Fixture {
        graph,
        module,
        metrics,
        alice,
    }
}

#[test]
fn naive_and_cached_agree_without_compaction() {
    let f = fixture(20, &[2020, 2021, 2021]);
    for (query, expected) in [
        (friend_since(2020), 1),
        (friend_since(2021), 2),
        (friend_since(1999), 0),
        (DetachedEdgeDescription::wildcard("FRIEND", Direction::Outgoing), 3),
        (DetachedEdgeDescription::wildcard("FRIEND", Direction::Incoming), 0),
        (DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing), 0),
        (
            DetachedEdgeDescription::literal("FRIEND", Direction::Both)
                .with("since", PropertyPredicate::Any),
            3,
        ),
        (DetachedEdgeDescription::wildcard("FOLLOWS", Direction::Both), 0),
    ] {
        let naive = f.module.naive_counter().count(&f.graph, f.alice, &query).unwrap();
        let cached = f.module.cached_counter().count(&f.graph, f.alice, &query).unwrap();
        assert_eq!(naive, expected, "naive {query}");
        assert_eq!(cached, expected, "cached {query}");
    }
}

#[test]
fn compaction_loses_precision_only_for_specific_queries() {
    let f = fixture(1, &[2020, 2021]);
    let err = f
        .module
        .cached_counter()
        .count(&f.graph, f.alice, &friend_since(2020))
        .unwrap_err();
    assert!(matches!(err, DegreeCacheError::UnableToCount { .. }));
    assert!(err.is_unable_to_count());

    let wildcard = DetachedEdgeDescription::wildcard("FRIEND", Direction::Outgoing);
    assert_eq!(f.module.cached_counter().count(&f.graph, f.alice, &wildcard).unwrap(), 2);
    assert_eq!(
        f.module.fallback_counter().count(&f.graph, f.alice, &friend_since(2020)).unwrap(),
        1
    );
    assert_eq!(f.metrics.unable_to_count.load(std::sync::atomic::Ordering::Relaxed), 2);
}

#[test]
fn fallback_records_metrics() {
    let f = fixture(1, &[2020, 2021]);
    let counter = f.module.fallback_counter();
    assert_eq!(counter.count(&f.graph, f.alice, &friend_since(2021)).unwrap(), 1);
    let wildcard = DetachedEdgeDescription::wildcard("FRIEND", Direction::Outgoing);
    assert_eq!(counter.count(&f.graph, f.alice, &wildcard).unwrap(), 2);

    let fallbacks = f.metrics.fallbacks.load(std::sync::atomic::Ordering::Relaxed);
    assert_eq!(fallbacks, 1);
    assert_eq!(f.metrics.cached_answers(), 1);
    assert!(f.metrics.compactions.load(std::sync::atomic::Ordering::Relaxed) >= 1);
}

#[test]
fn fallback_scans_when_entries_are_unreadable() {
    let mut f = fixture(20, &[2020]);
    let blob_key = format!("{}#", f.module.cache().prefix());
    f.graph
        .set_vertex_property(f.alice, &blob_key, PropertyValue::Bytes(vec![0xff, 0x00]))
        .unwrap();

    assert!(matches!(
        f.module.cached_counter().count(&f.graph, f.alice, &friend_since(2020)),
        Err(DegreeCacheError::Serialization(_))
    ));
    assert_eq!(
        f.module.fallback_counter().count(&f.graph, f.alice, &friend_since(2020)).unwrap(),
        1
    );
}

#[test]
fn unknown_vertices_are_errors_for_every_counter() {
    let f = fixture(20, &[2020]);
    let missing = VertexId(9_999);
    let query = friend_since(2020);
    assert!(matches!(
        f.module.naive_counter().count(&f.graph, missing, &query),
        Err(DegreeCacheError::NotFound(_))
    ));
    assert!(matches!(
        f.module.cached_counter().count(&f.graph, missing, &query),
        Err(DegreeCacheError::NotFound(_))
    ));
    assert!(matches!(
        f.module.fallback_counter().count(&f.graph, missing, &query),
        Err(DegreeCacheError::NotFound(_))
    ));
}

#[test]
fn weighted_degrees() {
    let module = DegreeCountModule::new(
        DegreeCacheOptions::new().weighing(Arc::new(PropertyWeight::new("weight", 1))),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let weight = |w: i64| BTreeMap::from([("weight".to_string(), PropertyValue::Int(w))]);
    graph.create_edge(a, b, "RATES", weight(3)).unwrap();
    graph.create_edge(a, b, "RATES", weight(4)).unwrap();
    graph.create_edge(a, b, "RATES", BTreeMap::new()).unwrap();
    module.commit(&mut graph).unwrap();

    let all = DetachedEdgeDescription::wildcard("RATES", Direction::Outgoing);
    assert_eq!(module.naive_counter().count(&graph, a, &all).unwrap(), 8);
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 8);
    let unweighted = DetachedEdgeDescription::literal("RATES", Direction::Incoming);
    assert_eq!(module.cached_counter().count(&graph, b, &unweighted).unwrap(), 1);
}

#[test]
fn hidden_weight_property_counts_on_every_path() {
    let module = DegreeCountModule::new(
        DegreeCacheOptions::new().weighing(Arc::new(PropertyWeight::new("__strength", 1))),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let strength = |w: i64| BTreeMap::from([("__strength".to_string(), PropertyValue::Int(w))]);
    let edge = graph.create_edge(a, b, "LIKES", strength(5)).unwrap();
    module.commit(&mut graph).unwrap();

    let all = DetachedEdgeDescription::wildcard("LIKES", Direction::Outgoing);
    assert_eq!(module.naive_counter().count(&graph, a, &all).unwrap(), 5);
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 5);
    assert_eq!(module.fallback_counter().count(&graph, a, &all).unwrap(), 5);

    graph.set_edge_property(edge, "__strength", PropertyValue::Int(2)).unwrap();
    graph.set_edge_property(edge, "note", PropertyValue::from("x")).unwrap();
    module.commit(&mut graph).unwrap();
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 2);

    module.reinitialize(&mut graph).unwrap();
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 2);
    let incoming = DetachedEdgeDescription::wildcard("LIKES", Direction::Incoming);
    assert_eq!(module.cached_counter().count(&graph, b, &incoming).unwrap(), 2);
}

#[test]
fn zero_weight_edges_leave_no_entries() {
    let module = DegreeCountModule::new(
        DegreeCacheOptions::new().weighing(Arc::new(PropertyWeight::new("strength", 1))),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let strength = |w: i64| BTreeMap::from([("strength".to_string(), PropertyValue::Int(w))]);
    let first = graph.create_edge(a, b, "LIKES", strength(0)).unwrap();
    let second = graph.create_edge(a, b, "LIKES", strength(0)).unwrap();
    module.commit(&mut graph).unwrap();
    assert!(module.cache().read_entries(&graph, a).unwrap().is_empty());

    graph.delete_edge(first).unwrap();
    module.commit(&mut graph).unwrap();
    graph.delete_edge(second).unwrap();
    module.commit(&mut graph).unwrap();
    assert!(module.needs_reinitialization().is_empty());

    let all = DetachedEdgeDescription::wildcard("LIKES", Direction::Outgoing);
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 0);
}

#[test]
fn negative_weights_are_rejected() {
    let module = DegreeCountModule::new(
        DegreeCacheOptions::new().weighing(Arc::new(PropertyWeight::new("strength", 1))),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let strength = BTreeMap::from([("strength".to_string(), PropertyValue::Int(-3))]);
    graph.create_edge(a, b, "LIKES", strength).unwrap();
    assert!(matches!(
        module.commit(&mut graph),
        Err(DegreeCacheError::InvalidArgument(_))
    ));
    let all = DetachedEdgeDescription::wildcard("LIKES", Direction::Outgoing);
    assert!(matches!(
        module.naive_counter().count(&graph, a, &all),
        Err(DegreeCacheError::InvalidArgument(_))
    ));
}
