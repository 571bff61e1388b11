#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use sombra_relcount::{
    DegreeCacheError, DegreeCacheOptions, DegreeCountModule, DegreeCounter,
    DetachedEdgeDescription, Direction, GraphEdge, GraphView, InclusionPolicies, MemoryGraph,
    PropertyPredicate, PropertyValue, PropertyWeight, VertexId, VertexPropertyStore,
};

fn props(pairs: &[(&str, i64)]) -> BTreeMap<String, PropertyValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), PropertyValue::Int(*v)))
        .collect()
}

fn vertices(graph: &mut MemoryGraph, n: usize) -> Vec<VertexId> {
    (0..n).map(|_| graph.create_vertex(BTreeMap::new())).collect()
}

fn friends(direction: Direction) -> DetachedEdgeDescription {
    DetachedEdgeDescription::wildcard("FRIEND", direction)
}

fn cached(module: &DegreeCountModule, graph: &MemoryGraph, v: VertexId, q: &DetachedEdgeDescription) -> i64 {
    module.cached_counter().count(graph, v, q).unwrap()
}

#[test]
fn created_edge_counts_on_both_endpoints() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 2);
    graph.create_edge(v[0], v[1], "FRIEND", props(&[("since", 2020)])).unwrap();
    module.commit(&mut graph).unwrap();

    let query = DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
        .with("since", PropertyPredicate::equal_to(2020));
    assert_eq!(module.naive_counter().count(&graph, v[0], &query).unwrap(), 1);
    assert_eq!(cached(&module, &graph, v[0], &query), 1);
    assert_eq!(cached(&module, &graph, v[1], &friends(Direction::Incoming)), 1);
    assert_eq!(cached(&module, &graph, v[1], &friends(Direction::Outgoing)), 0);
    assert_eq!(cached(&module, &graph, v[1], &friends(Direction::Both)), 1);
}

#[test]
fn property_changes_move_the_count() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 2);
    let edge = graph.create_edge(v[0], v[1], "FRIEND", props(&[("since", 2020)])).unwrap();
    module.commit(&mut graph).unwrap();

    graph.set_edge_property(edge, "since", PropertyValue::Int(2021)).unwrap();
    module.commit(&mut graph).unwrap();

    let old = friends(Direction::Outgoing).with("since", PropertyPredicate::equal_to(2020));
    let new = friends(Direction::Outgoing).with("since", PropertyPredicate::equal_to(2021));
    assert_eq!(cached(&module, &graph, v[0], &old), 0);
    assert_eq!(cached(&module, &graph, v[0], &new), 1);
    assert_eq!(cached(&module, &graph, v[1], &friends(Direction::Incoming)), 1);
}

#[test]
fn deleting_edges_and_vertices_keeps_counts_exact() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 3);
    let first = graph.create_edge(v[0], v[1], "FRIEND", BTreeMap::new()).unwrap();
    graph.create_edge(v[0], v[2], "FRIEND", BTreeMap::new()).unwrap();
    module.commit(&mut graph).unwrap();
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Outgoing)), 2);

    graph.delete_edge(first).unwrap();
    module.commit(&mut graph).unwrap();
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Outgoing)), 1);
    assert_eq!(cached(&module, &graph, v[1], &friends(Direction::Both)), 0);

    graph.delete_vertex(v[2]).unwrap();
    module.commit(&mut graph).unwrap();
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Both)), 0);
    assert!(graph.vertex_property_keys(v[0]).unwrap().is_empty());
}

#[test]
fn self_loops_count_once_per_direction() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 1);
    graph.create_edge(v[0], v[0], "FRIEND", BTreeMap::new()).unwrap();
    module.commit(&mut graph).unwrap();

    for direction in [Direction::Outgoing, Direction::Incoming] {
        assert_eq!(cached(&module, &graph, v[0], &friends(direction)), 1);
        assert_eq!(module.naive_counter().count(&graph, v[0], &friends(direction)).unwrap(), 1);
    }
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Both)), 2);
    assert_eq!(module.naive_counter().count(&graph, v[0], &friends(Direction::Both)).unwrap(), 2);
}

#[test]
fn modules_with_different_ids_do_not_interfere() {
    let social = DegreeCountModule::new(DegreeCacheOptions::new().id("social")).unwrap();
    let weighted = DegreeCountModule::new(
        DegreeCacheOptions::new()
            .id("weighted")
            .weighing(Arc::new(PropertyWeight::new("strength", 1))),
    )
    .unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 2);
    graph.create_edge(v[0], v[1], "FRIEND", props(&[("strength", 5)])).unwrap();
    let batch = graph.take_batch();
    social.before_commit(&mut graph, &batch).unwrap();
    weighted.before_commit(&mut graph, &batch).unwrap();

    let query = friends(Direction::Outgoing);
    assert_eq!(cached(&social, &graph, v[0], &query), 1);
    assert_eq!(cached(&weighted, &graph, v[0], &query), 5);

    social.clear_cached_counts(&mut graph, v[0]).unwrap();
    assert_eq!(cached(&social, &graph, v[0], &query), 0);
    assert_eq!(cached(&weighted, &graph, v[0], &query), 5);
}

#[test]
fn excluded_edges_vertices_and_properties_are_ignored() {
    let hidden = VertexId(2);
    let inclusion = InclusionPolicies::new()
        .with_edges(|edge| edge.edge_type() != "BLOCKS")
        .with_vertices(move |vertex| vertex != hidden)
        .with_edge_properties(|key| key != "audit");
    let module = DegreeCountModule::new(DegreeCacheOptions::new().inclusion(inclusion)).unwrap();
    let mut graph = MemoryGraph::new();
    graph.ensure_vertex(VertexId(1));
    graph.ensure_vertex(hidden);
    graph.ensure_vertex(VertexId(3));
    graph.create_edge(VertexId(1), hidden, "FRIEND", BTreeMap::new()).unwrap();
    graph.create_edge(VertexId(1), VertexId(3), "BLOCKS", BTreeMap::new()).unwrap();
    graph
        .create_edge(VertexId(1), VertexId(3), "FRIEND", props(&[("audit", 7)]))
        .unwrap();
    module.commit(&mut graph).unwrap();

    let literal = DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing);
    assert_eq!(cached(&module, &graph, VertexId(1), &literal), 2);
    assert_eq!(
        cached(&module, &graph, VertexId(1), &DetachedEdgeDescription::wildcard("BLOCKS", Direction::Both)),
        0
    );
    assert!(graph.vertex_property_keys(hidden).unwrap().is_empty());
    assert_eq!(module.naive_counter().count(&graph, VertexId(1), &literal).unwrap(), 2);
}

#[test]
fn out_of_sync_cache_is_rebuilt_on_request() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 2);
    let edge = graph.create_edge(v[0], v[1], "FRIEND", BTreeMap::new()).unwrap();
    graph.create_edge(v[1], v[0], "FRIEND", BTreeMap::new()).unwrap();
    // Edges reach the graph without passing through the module.
    let _ = graph.take_batch();

    graph.delete_edge(edge).unwrap();
    let err = module.commit(&mut graph).unwrap_err();
    assert!(matches!(err, DegreeCacheError::NeedsReinitialization { .. }));
    assert!(!module.needs_reinitialization().is_empty());

    module.reinitialize_pending(&mut graph).unwrap();
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Incoming)), 1);
    assert_eq!(cached(&module, &graph, v[0], &friends(Direction::Outgoing)), 0);
}

#[test]
fn vertices_touched_before_a_failure_are_still_flushed() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 4);
    let uncached = graph.create_edge(v[0], v[1], "FRIEND", BTreeMap::new()).unwrap();
    // Edges reach the graph without passing through the module.
    let _ = graph.take_batch();

    graph.create_edge(v[2], v[3], "FRIEND", props(&[("since", 2022)])).unwrap();
    graph.delete_edge(uncached).unwrap();
    let err = module.commit(&mut graph).unwrap_err();
    assert!(err.needs_reinitialization());

    let created = DetachedEdgeDescription::literal("FRIEND", Direction::Outgoing)
        .with("since", PropertyPredicate::equal_to(2022));
    let persisted = module.cache().read_entries(&graph, v[2]).unwrap();
    assert_eq!(persisted.get(&created), Some(&1));
    assert_eq!(cached(&module, &graph, v[3], &friends(Direction::Incoming)), 1);
    assert_eq!(module.needs_reinitialization(), v.iter().copied().collect::<BTreeSet<_>>());
}

#[test]
fn reinitialize_matches_incremental_maintenance() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 4);
    for (i, &start) in v.iter().enumerate() {
        for &end in &v[i..] {
            graph
                .create_edge(start, end, "FRIEND", props(&[("since", 2015 + i as i64)]))
                .unwrap();
        }
    }
    module.commit(&mut graph).unwrap();
    let incremental: Vec<_> = v
        .iter()
        .map(|&id| module.cache().read_entries(&graph, id).unwrap())
        .collect();

    assert_eq!(module.reinitialize(&mut graph).unwrap(), graph.vertex_ids().len());
    let rebuilt: Vec<_> = v
        .iter()
        .map(|&id| module.cache().read_entries(&graph, id).unwrap())
        .collect();
    assert_eq!(incremental, rebuilt);
}

#[test]
fn scopes_reject_misuse() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let mut graph = MemoryGraph::new();
    let v = vertices(&mut graph, 2);
    let edge = graph.create_edge(v[0], v[1], "FRIEND", BTreeMap::new()).unwrap();
    let edge = graph.edge(edge).unwrap().clone();

    let mut scope = module.cache().scope();
    assert!(matches!(
        scope.handle_created_edge(&graph, &edge, v[0], Direction::Outgoing),
        Err(DegreeCacheError::IllegalScope(_))
    ));
    scope.start().unwrap();
    assert!(matches!(scope.start(), Err(DegreeCacheError::IllegalScope(_))));
    assert!(matches!(
        scope.handle_created_edge(&graph, &edge, v[0], Direction::Both),
        Err(DegreeCacheError::InvalidArgument(_))
    ));
    scope.handle_created_edge(&graph, &edge, v[0], Direction::Incoming).unwrap();
    assert_eq!(scope.end(&mut graph).unwrap(), 1);
    assert!(!scope.is_active());
    assert!(matches!(scope.end(&mut graph), Err(DegreeCacheError::IllegalScope(_))));
}
