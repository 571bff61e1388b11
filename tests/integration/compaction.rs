#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use sombra_relcount::{
    compact::{compact, produce_generalization},
    CompactionStrategy, DegreeCacheOptions, DegreeCachingVertex, DegreeCountModule, DegreeCounter,
    DetachedEdgeDescription, Direction, GeneralizationOrder, MemoryGraph, NoopMetrics,
    PropertiesDescription, PropertyPredicate, PropertyValue, VertexId,
};

fn vertex(strategy: CompactionStrategy) -> DegreeCachingVertex {
    DegreeCachingVertex::new(
        VertexId(1),
        "__degrees_default_",
        BTreeMap::new(),
        strategy,
        Arc::new(NoopMetrics),
    )
}

fn friend(since: i64) -> DetachedEdgeDescription {
    DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
        .with("since", PropertyPredicate::equal_to(since))
}

fn total(v: &DegreeCachingVertex) -> i64 {
    v.cached_degrees().values().sum()
}

#[test]
fn entries_stay_under_threshold_and_keep_their_mass() {
    let mut v = vertex(CompactionStrategy::new(2));
    for year in 2020..2025 {
        v.increment_degree(&friend(year), 1).unwrap();
    }
    assert!(v.cached_degrees().len() <= 2);
    assert_eq!(total(&v), 5);

    let merged = DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
        .with("since", PropertyPredicate::Any);
    assert_eq!(v.cached_degrees().get(&merged), Some(&5));
}

#[test]
fn merged_entries_absorb_later_edges() {
    let mut v = vertex(CompactionStrategy::new(1));
    v.increment_degree(&friend(2020), 1).unwrap();
    v.increment_degree(&friend(2021), 1).unwrap();
    v.increment_degree(&friend(2030), 4).unwrap();
    assert_eq!(v.cached_degrees().len(), 1);
    assert_eq!(total(&v), 6);

    v.decrement_degree(&friend(2030), 4).unwrap();
    assert_eq!(total(&v), 2);
}

#[test]
fn unreachable_threshold_keeps_entries() {
    let mut v = vertex(CompactionStrategy::new(1));
    v.increment_degree(&DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing), 1)
        .unwrap();
    v.increment_degree(&DetachedEdgeDescription::literal("FOLLOWS", Direction::Outgoing), 1)
        .unwrap();
    assert_eq!(v.cached_degrees().len(), 2);
    assert!(!compact(&mut v).unwrap());
    assert_eq!(total(&v), 2);
}

#[test]
fn directions_are_never_merged() {
    let entries = BTreeMap::from([
        (DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing), 1),
        (DetachedEdgeDescription::literal("FRIEND", Direction::Incoming), 1),
    ]);
    assert!(produce_generalization(&entries, GeneralizationOrder::ChangeFrequency).is_none());
}

#[test]
fn frequently_changing_keys_are_generalized_first() {
    let edge = |colour: &str, since: i64| {
        DetachedEdgeDescription::literal("LIKES", Direction::Outgoing)
            .with("colour", PropertyPredicate::equal_to(colour))
            .with("since", PropertyPredicate::equal_to(since))
    };
    let entries = BTreeMap::from([
        (edge("red", 2020), 1),
        (edge("red", 2021), 1),
        (edge("red", 2022), 1),
        (edge("blue", 2020), 1),
    ]);
    let generalization =
        produce_generalization(&entries, GeneralizationOrder::ChangeFrequency).unwrap();
    assert_eq!(
        generalization.properties().get("since"),
        PropertyPredicate::Any
    );
    assert_eq!(
        generalization.properties().get("colour"),
        PropertyPredicate::EqualTo(PropertyValue::from("red"))
    );
}

#[test]
fn module_keeps_counting_through_compaction() {
    let module =
        DegreeCountModule::new(DegreeCacheOptions::new().compaction_threshold(1)).unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let since = |year: i64| BTreeMap::from([("since".to_string(), PropertyValue::Int(year))]);
    let first = graph.create_edge(a, b, "FRIEND", since(2020)).unwrap();
    graph.create_edge(a, b, "FRIEND", since(2021)).unwrap();
    module.commit(&mut graph).unwrap();

    graph.delete_edge(first).unwrap();
    module.commit(&mut graph).unwrap();

    let all = DetachedEdgeDescription::wildcard("FRIEND", Direction::Outgoing);
    assert_eq!(module.cached_counter().count(&graph, a, &all).unwrap(), 1);
    assert_eq!(module.fallback_counter().count(&graph, a, &friend(2021)).unwrap(), 1);
    assert_eq!(module.fallback_counter().count(&graph, a, &friend(2020)).unwrap(), 0);
}
