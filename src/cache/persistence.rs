use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use tracing::warn;

use crate::description::{codec, DetachedEdgeDescription};
use crate::error::{DegreeCacheError, Result};
use crate::graph::VertexPropertyStore;
use crate::model::{PropertyValue, VertexId};

/// Stores a vertex's cached degrees in its own properties.
pub trait DegreePersistence: Send + Sync + Debug {
    /// Writes the entries of `vertex`.
    ///
    /// `all` is the complete entry map; `updated` and `removed` are the descriptions changed
    /// since the entries were read.
    fn write_entries(
        &self,
        store: &mut dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        all: &BTreeMap<DetachedEdgeDescription, i64>,
        updated: &BTreeSet<DetachedEdgeDescription>,
        removed: &BTreeSet<DetachedEdgeDescription>,
    ) -> Result<()>;

    /// Reads the entries of `vertex`. In lenient mode malformed data is skipped with a
    /// warning instead of failing the read.
    fn read_entries(
        &self,
        store: &dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        lenient: bool,
    ) -> Result<BTreeMap<DetachedEdgeDescription, i64>>;

    /// Removes every property under `prefix`.
    fn clear_entries(
        &self,
        store: &mut dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
    ) -> Result<()> {
        for key in store.vertex_property_keys(vertex)? {
            if key.starts_with(prefix) {
                store.remove_vertex_property(vertex, &key)?;
            }
        }
        Ok(())
    }
}

/// One integer vertex property per entry, keyed by the prefixed description string.
///
/// Only changed entries are written on flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyPerEntry;

impl DegreePersistence for PropertyPerEntry {
    fn write_entries(
        &self,
        store: &mut dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        all: &BTreeMap<DetachedEdgeDescription, i64>,
        updated: &BTreeSet<DetachedEdgeDescription>,
        removed: &BTreeSet<DetachedEdgeDescription>,
    ) -> Result<()> {
        for description in removed {
            store.remove_vertex_property(vertex, &description.to_prefixed_string(prefix)?)?;
        }
        for description in updated {
            if let Some(degree) = all.get(description) {
                store.set_vertex_property(
                    vertex,
                    &description.to_prefixed_string(prefix)?,
                    PropertyValue::Int(*degree),
                )?;
            }
        }
        Ok(())
    }

    fn read_entries(
        &self,
        store: &dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        lenient: bool,
    ) -> Result<BTreeMap<DetachedEdgeDescription, i64>> {
        let mut entries = BTreeMap::new();
        for key in store.vertex_property_keys(vertex)? {
            if !key.starts_with(prefix) || key == blob_key(prefix) {
                continue;
            }
            let parsed = DetachedEdgeDescription::from_prefixed_string(&key, prefix).and_then(
                |description| match store.vertex_property(vertex, &key)? {
                    Some(PropertyValue::Int(degree)) => Ok((description, degree)),
                    other => Err(DegreeCacheError::Serialization(format!(
                        "degree property holds {other:?}, expected an integer"
                    ))),
                },
            );
            match parsed {
                Ok((description, degree)) => {
                    entries.insert(description, degree);
                }
                Err(err) if lenient => skip_malformed(vertex, &key, &err),
                Err(err) => return Err(err),
            }
        }
        Ok(entries)
    }
}

/// All entries of a prefix in one byte-string vertex property.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleBlob;

impl DegreePersistence for SingleBlob {
    fn write_entries(
        &self,
        store: &mut dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        all: &BTreeMap<DetachedEdgeDescription, i64>,
        _updated: &BTreeSet<DetachedEdgeDescription>,
        _removed: &BTreeSet<DetachedEdgeDescription>,
    ) -> Result<()> {
        let key = blob_key(prefix);
        if all.is_empty() {
            return store.remove_vertex_property(vertex, &key);
        }
        store.set_vertex_property(vertex, &key, PropertyValue::Bytes(codec::encode_entries(all)?))
    }

    fn read_entries(
        &self,
        store: &dyn VertexPropertyStore,
        vertex: VertexId,
        prefix: &str,
        lenient: bool,
    ) -> Result<BTreeMap<DetachedEdgeDescription, i64>> {
        let key = blob_key(prefix);
        let decoded = match store.vertex_property(vertex, &key)? {
            None => return Ok(BTreeMap::new()),
            Some(PropertyValue::Bytes(bytes)) => codec::decode_entries(&bytes),
            Some(other) => Err(DegreeCacheError::Serialization(format!(
                "degree blob holds {other:?}, expected bytes"
            ))),
        };
        match decoded {
            Ok(entries) => Ok(entries),
            Err(err) if lenient => {
                skip_malformed(vertex, &key, &err);
                Ok(BTreeMap::new())
            }
            Err(err) => Err(err),
        }
    }
}

fn blob_key(prefix: &str) -> String {
    format!("{prefix}#")
}

fn skip_malformed(vertex: VertexId, key: &str, err: &DegreeCacheError) {
    warn!(vertex = %vertex, key, error = %err, "relcount.persistence.malformed_entry_skipped");
}
