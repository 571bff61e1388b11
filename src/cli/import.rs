use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::DegreeCacheError;
use crate::graph::MemoryGraph;
use crate::model::{PropertyValue, VertexId};

/// Configuration for loading edges from a CSV file.
#[derive(Debug, Clone)]
pub struct EdgeImportConfig {
    /// Path to the CSV file.
    pub path: PathBuf,
    /// Column holding the external id of the start vertex.
    pub start_column: String,
    /// Column holding the external id of the end vertex.
    pub end_column: String,
    /// Column holding the edge type.
    pub type_column: Option<String>,
    /// Edge type used when no type column is given.
    pub static_type: Option<String>,
    /// Columns imported as edge properties; every other column when `None`.
    pub prop_columns: Option<Vec<String>>,
}

impl EdgeImportConfig {
    /// Config with `start`, `end` and `type` columns, every other column a property.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            start_column: "start".into(),
            end_column: "end".into(),
            type_column: Some("type".into()),
            static_type: None,
            prop_columns: None,
        }
    }
}

/// Counts from an import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Distinct vertices referenced by the file.
    pub vertices_imported: u64,
    /// Edges created.
    pub edges_imported: u64,
}

/// A graph loaded from CSV, with the mapping from external ids to vertices.
#[derive(Debug, Default)]
pub struct ImportedGraph {
    /// The loaded graph. Its edges are pending until the next batch is taken.
    pub graph: MemoryGraph,
    /// External id to vertex.
    pub ids: HashMap<String, VertexId>,
    /// Import counts.
    pub summary: ImportSummary,
}

impl ImportedGraph {
    /// Vertex for an external id.
    pub fn vertex(&self, external: &str) -> Result<VertexId, CliError> {
        self.ids
            .get(external)
            .copied()
            .ok_or_else(|| CliError::Message(format!("unknown vertex '{external}'")))
    }
}

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON rendering error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Degree cache error.
    #[error(transparent)]
    Cache(#[from] DegreeCacheError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

struct ColumnSpec {
    name: String,
    index: usize,
}

/// Loads every row of the file as one edge of a fresh [`MemoryGraph`].
pub fn import_edges(cfg: &EdgeImportConfig) -> Result<ImportedGraph, CliError> {
    if cfg.type_column.is_none() && cfg.static_type.is_none() {
        return Err("an edge type column or a static edge type is required".into());
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let start_idx = find_column(&headers, &cfg.start_column)?;
    let end_idx = find_column(&headers, &cfg.end_column)?;
    let type_idx = match &cfg.type_column {
        Some(name) if cfg.static_type.is_none() => Some(find_column(&headers, name)?),
        Some(name) => headers.iter().position(|h| h.eq_ignore_ascii_case(name)),
        None => None,
    };
    let mut skip = vec![start_idx, end_idx];
    skip.extend(type_idx);
    let prop_columns = resolve_prop_columns(&headers, &cfg.prop_columns, &skip)?;

    let mut imported = ImportedGraph::default();
    for record in reader.records() {
        let record = record?;
        let start = get_required(&record, start_idx, &cfg.start_column)?;
        let end = get_required(&record, end_idx, &cfg.end_column)?;
        let edge_type = match (type_idx, &cfg.static_type) {
            (Some(idx), _) => get_required(&record, idx, "type")?.to_string(),
            (None, Some(static_type)) => static_type.clone(),
            (None, None) => return Err("edge type missing".into()),
        };
        let start = intern_vertex(&mut imported, start);
        let end = intern_vertex(&mut imported, end);
        let props = build_props(&record, &prop_columns);
        imported.graph.create_edge(start, end, edge_type, props)?;
        imported.summary.edges_imported += 1;
    }
    debug!(
        path = %cfg.path.display(),
        vertices = imported.summary.vertices_imported,
        edges = imported.summary.edges_imported,
        "relcount.cli.imported"
    );
    Ok(imported)
}

fn intern_vertex(imported: &mut ImportedGraph, external: &str) -> VertexId {
    if let Some(id) = imported.ids.get(external) {
        return *id;
    }
    let id = imported.graph.create_vertex(BTreeMap::new());
    imported.ids.insert(external.to_string(), id);
    imported.summary.vertices_imported += 1;
    id
}

fn resolve_prop_columns(
    headers: &StringRecord,
    requested: &Option<Vec<String>>,
    skip: &[usize],
) -> Result<Vec<ColumnSpec>, CliError> {
    if let Some(list) = requested {
        let mut cols = Vec::with_capacity(list.len());
        for name in list {
            let idx = find_column(headers, name)?;
            cols.push(ColumnSpec {
                name: name.clone(),
                index: idx,
            });
        }
        Ok(cols)
    } else {
        Ok(headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !skip.contains(idx))
            .map(|(index, header)| ColumnSpec {
                name: header.to_string(),
                index,
            })
            .collect())
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Message(format!("column '{}' not found", name)))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, CliError> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("missing value for column '{}'", name)))
}

fn build_props(record: &StringRecord, columns: &[ColumnSpec]) -> BTreeMap<String, PropertyValue> {
    let mut props = BTreeMap::new();
    for col in columns {
        let Some(raw) = record.get(col.index).map(str::trim) else {
            continue;
        };
        // Empty cells mean the property is absent.
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            continue;
        }
        props.insert(col.name.clone(), PropertyValue::parse_loose(raw));
    }
    props
}

/// Parses `key=value` into a property pair, the value typed like a CSV cell.
pub fn parse_property_arg(raw: &str) -> Result<(String, PropertyValue), CliError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::Message(format!("expected key=value, got '{raw}'")))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::Message(format!("empty property key in '{raw}'")));
    }
    Ok((key.to_string(), PropertyValue::parse_loose(value.trim())))
}
