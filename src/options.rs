use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{DegreePersistence, PropertyPerEntry, SingleBlob};
use crate::compact::{CompactionStrategy, GeneralizationOrder, DEFAULT_COMPACTION_THRESHOLD};
use crate::error::{DegreeCacheError, Result};
use crate::graph::InclusionPolicies;
use crate::metrics::{default_metrics, DegreeMetrics};
use crate::weigh::{OneForEach, PropertyWeight, WeighingStrategy};

/// Module id used when none is configured.
pub const DEFAULT_MODULE_ID: &str = "default";

/// Configuration supplied when creating a [`crate::DegreeCountModule`].
#[derive(Clone)]
pub struct DegreeCacheOptions {
    /// Module id; namespaces the vertex properties holding cached degrees.
    pub id: String,
    /// Entry-count cap and generalization order.
    pub compaction: CompactionStrategy,
    /// How entries are stored on vertices.
    pub persistence: Arc<dyn DegreePersistence>,
    /// Whether malformed persisted entries are skipped instead of failing the read.
    pub lenient: bool,
    /// Weight of each edge.
    pub weighing: Arc<dyn WeighingStrategy>,
    /// Vertices, edges and edge properties taken into account.
    pub inclusion: InclusionPolicies,
    /// Statistics sink.
    pub metrics: Arc<dyn DegreeMetrics>,
}

impl Default for DegreeCacheOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DegreeCacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DegreeCacheOptions")
            .field("id", &self.id)
            .field("compaction", &self.compaction)
            .field("persistence", &self.persistence)
            .field("lenient", &self.lenient)
            .field("weighing", &self.weighing)
            .finish_non_exhaustive()
    }
}

impl DegreeCacheOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self {
            id: DEFAULT_MODULE_ID.to_string(),
            compaction: CompactionStrategy::default(),
            persistence: Arc::new(SingleBlob),
            lenient: false,
            weighing: Arc::new(OneForEach),
            inclusion: InclusionPolicies::default(),
            metrics: default_metrics(),
        }
    }

    /// Sets the module id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the maximum number of entries kept per vertex.
    pub fn compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction.threshold = threshold;
        self
    }

    /// Sets the order in which property keys are generalized.
    pub fn generalization_order(mut self, order: GeneralizationOrder) -> Self {
        self.compaction.order = order;
        self
    }

    /// Sets the persistence strategy.
    pub fn persistence(mut self, persistence: Arc<dyn DegreePersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Enables or disables lenient reads of persisted entries.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Sets the weighing strategy.
    pub fn weighing(mut self, weighing: Arc<dyn WeighingStrategy>) -> Self {
        self.weighing = weighing;
        self
    }

    /// Sets the inclusion policies.
    pub fn inclusion(mut self, inclusion: InclusionPolicies) -> Self {
        self.inclusion = inclusion;
        self
    }

    /// Sets the metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn DegreeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Vertex property prefix for this module, `__degrees_<id>_`.
    pub fn prefix(&self) -> String {
        format!("__degrees_{}_", self.id)
    }

    /// Checks the options for values the cache cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(DegreeCacheError::InvalidArgument(
                "module id must be non-empty".into(),
            ));
        }
        if !self.id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DegreeCacheError::InvalidArgument(format!(
                "module id '{}' must be ASCII alphanumeric",
                self.id
            )));
        }
        if self.compaction.threshold == 0 {
            return Err(DegreeCacheError::InvalidArgument(
                "compaction threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// File form of [`DegreeCacheOptions`].
///
/// ```toml
/// id = "social"
/// compaction_threshold = 20
/// generalization_order = "change_frequency"
/// persistence = "single_blob"
/// lenient = false
/// weight_property = "strength"
/// weight_default = 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DegreeCacheConfig {
    /// Module id.
    pub id: Option<String>,
    /// Maximum entries per vertex.
    pub compaction_threshold: Option<usize>,
    /// `change_frequency` or `key_name`.
    pub generalization_order: Option<String>,
    /// `single_blob` or `property_per_entry`.
    pub persistence: Option<String>,
    /// Lenient reads of persisted entries.
    pub lenient: Option<bool>,
    /// Integer edge property used as edge weight.
    pub weight_property: Option<String>,
    /// Weight of edges lacking the weight property.
    pub weight_default: Option<i64>,
}

impl DegreeCacheConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| DegreeCacheError::Config(err.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|err| DegreeCacheError::Config(format!("{}: {err}", path.display())))
    }

    /// Builds options, keeping defaults for unset fields.
    pub fn into_options(self) -> Result<DegreeCacheOptions> {
        let mut options = DegreeCacheOptions::new();
        if let Some(id) = self.id {
            options = options.id(id);
        }
        options = options.compaction_threshold(
            self.compaction_threshold
                .unwrap_or(DEFAULT_COMPACTION_THRESHOLD),
        );
        if let Some(order) = self.generalization_order.as_deref() {
            options = options.generalization_order(parse_order(order)?);
        }
        if let Some(persistence) = self.persistence.as_deref() {
            options = options.persistence(parse_persistence(persistence)?);
        }
        if let Some(lenient) = self.lenient {
            options = options.lenient(lenient);
        }
        match self.weight_property {
            Some(key) => {
                let default = self.weight_default.unwrap_or(1);
                options = options.weighing(Arc::new(PropertyWeight::new(key, default)));
            }
            None if self.weight_default.is_some() => {
                return Err(DegreeCacheError::Config(
                    "weight_default requires weight_property".into(),
                ));
            }
            None => {}
        }
        options.validate()?;
        Ok(options)
    }
}

fn parse_order(value: &str) -> Result<GeneralizationOrder> {
    match value {
        "change_frequency" => Ok(GeneralizationOrder::ChangeFrequency),
        "key_name" => Ok(GeneralizationOrder::KeyName),
        other => Err(DegreeCacheError::Config(format!(
            "unknown generalization order '{other}'"
        ))),
    }
}

fn parse_persistence(value: &str) -> Result<Arc<dyn DegreePersistence>> {
    match value {
        "single_blob" => Ok(Arc::new(SingleBlob)),
        "property_per_entry" => Ok(Arc::new(PropertyPerEntry)),
        other => Err(DegreeCacheError::Config(format!(
            "unknown persistence strategy '{other}'"
        ))),
    }
}
