#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use sombra_relcount::{
    DegreeCacheConfig, DegreeCacheError, DegreeCacheOptions, DegreeCountModule, DegreeCounter,
    DetachedEdgeDescription, Direction, MemoryGraph, PropertyPerEntry, PropertyValue, SingleBlob,
    VertexId, VertexPropertyStore,
};
use tempfile::TempDir;

fn since(year: i64) -> BTreeMap<String, PropertyValue> {
    BTreeMap::from([("since".to_string(), PropertyValue::Int(year))])
}

fn seeded(module: &DegreeCountModule) -> (MemoryGraph, VertexId) {
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    for year in [2020, 2021, 2021] {
        let b = graph.create_vertex(BTreeMap::new());
        graph.create_edge(a, b, "FRIEND", since(year)).unwrap();
    }
    module.commit(&mut graph).unwrap();
    (graph, a)
}

fn degree_keys(graph: &MemoryGraph, vertex: VertexId) -> Vec<String> {
    graph
        .vertex_property_keys(vertex)
        .unwrap()
        .into_iter()
        .filter(|key| key.starts_with("__degrees_"))
        .collect()
}

#[test]
fn strategies_store_the_same_entries_differently() {
    let per_entry =
        DegreeCountModule::new(DegreeCacheOptions::new().persistence(Arc::new(PropertyPerEntry)))
            .unwrap();
    let blob = DegreeCountModule::new(DegreeCacheOptions::new().persistence(Arc::new(SingleBlob)))
        .unwrap();
    let (per_entry_graph, a) = seeded(&per_entry);
    let (blob_graph, b) = seeded(&blob);

    assert_eq!(degree_keys(&per_entry_graph, a).len(), 2);
    assert_eq!(degree_keys(&blob_graph, b), vec!["__degrees_default_#".to_string()]);
    assert_eq!(
        per_entry.cache().read_entries(&per_entry_graph, a).unwrap(),
        blob.cache().read_entries(&blob_graph, b).unwrap()
    );
    for key in degree_keys(&per_entry_graph, a) {
        let value = per_entry_graph.vertex_property(a, &key).unwrap();
        assert!(matches!(value, Some(PropertyValue::Int(_))));
    }
}

#[test]
fn removed_entries_disappear_from_storage() {
    let module =
        DegreeCountModule::new(DegreeCacheOptions::new().persistence(Arc::new(PropertyPerEntry)))
            .unwrap();
    let mut graph = MemoryGraph::new();
    let a = graph.create_vertex(BTreeMap::new());
    let b = graph.create_vertex(BTreeMap::new());
    let edge = graph.create_edge(a, b, "FRIEND", since(2020)).unwrap();
    module.commit(&mut graph).unwrap();
    assert_eq!(degree_keys(&graph, a).len(), 1);

    graph.delete_edge(edge).unwrap();
    module.commit(&mut graph).unwrap();
    assert!(degree_keys(&graph, a).is_empty());
    assert!(degree_keys(&graph, b).is_empty());
}

#[test]
fn lenient_reads_skip_malformed_entries() {
    let strict =
        DegreeCountModule::new(DegreeCacheOptions::new().persistence(Arc::new(PropertyPerEntry)))
            .unwrap();
    let lenient = DegreeCountModule::new(
        DegreeCacheOptions::new()
            .persistence(Arc::new(PropertyPerEntry))
            .lenient(true),
    )
    .unwrap();
    let (mut graph, a) = seeded(&strict);
    graph
        .set_vertex_property(a, "__degrees_default_garbage", PropertyValue::Int(3))
        .unwrap();

    assert!(matches!(
        strict.cache().read_entries(&graph, a),
        Err(DegreeCacheError::Serialization(_))
    ));
    let entries = lenient.cache().read_entries(&graph, a).unwrap();
    assert_eq!(entries.values().sum::<i64>(), 3);

    let all = DetachedEdgeDescription::wildcard("FRIEND", Direction::Outgoing);
    assert_eq!(lenient.cached_counter().count(&graph, a, &all).unwrap(), 3);
}

#[test]
fn clearing_leaves_other_properties_alone() {
    let module = DegreeCountModule::new(DegreeCacheOptions::new()).unwrap();
    let (mut graph, a) = seeded(&module);
    graph
        .set_vertex_property(a, "name", PropertyValue::from("alice"))
        .unwrap();
    module.clear_cached_counts(&mut graph, a).unwrap();
    assert!(degree_keys(&graph, a).is_empty());
    assert_eq!(
        graph.vertex_property(a, "name").unwrap(),
        Some(PropertyValue::from("alice"))
    );
}

#[test]
fn options_load_from_toml_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("relcount.toml");
    fs::write(
        &path,
        r#"
id = "social"
compaction_threshold = 1
persistence = "property_per_entry"
"#,
    )
    .unwrap();

    let options = DegreeCacheConfig::load(&path).unwrap().into_options().unwrap();
    let module = DegreeCountModule::new(options).unwrap();
    assert_eq!(module.id(), "social");
    let (graph, a) = seeded(&module);
    let keys = degree_keys(&graph, a);
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("__degrees_social_"));

    let missing = DegreeCacheConfig::load(&dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(DegreeCacheError::Io(_))));
}
