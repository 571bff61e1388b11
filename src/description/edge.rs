use std::fmt;

use crate::error::Result;
use crate::graph::GraphEdge;
use crate::model::Direction;

use super::codec;
use super::predicate::PropertyPredicate;
use super::properties::{DetachedPropertiesDescription, PropertiesDescription};

/// Edge type, direction and property predicates, detached from the live graph.
///
/// Stored descriptions always carry a resolved direction. Queries may use
/// [`Direction::Both`], which is more general than either side.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DetachedEdgeDescription {
    edge_type: String,
    direction: Direction,
    properties: DetachedPropertiesDescription,
}

impl DetachedEdgeDescription {
    /// Creates a description from its parts.
    pub fn new(
        edge_type: impl Into<String>,
        direction: Direction,
        properties: DetachedPropertiesDescription,
    ) -> Self {
        Self {
            edge_type: edge_type.into(),
            direction,
            properties,
        }
    }

    /// Literal description without explicit predicates: matches only property-less edges.
    pub fn literal(edge_type: impl Into<String>, direction: Direction) -> Self {
        Self::new(edge_type, direction, DetachedPropertiesDescription::literal())
    }

    /// Wildcard description without explicit predicates: matches every edge of the type.
    pub fn wildcard(edge_type: impl Into<String>, direction: Direction) -> Self {
        Self::new(edge_type, direction, DetachedPropertiesDescription::wildcard())
    }

    /// Literal snapshot of a live edge seen with the given resolved direction.
    pub fn of_edge(edge: &dyn GraphEdge, direction: Direction) -> Self {
        Self::new(
            edge.edge_type(),
            direction,
            DetachedPropertiesDescription::literal_of(edge),
        )
    }

    /// Returns a copy with `key` constrained by `predicate`.
    pub fn with(&self, key: impl Into<String>, predicate: PropertyPredicate) -> Self {
        Self {
            edge_type: self.edge_type.clone(),
            direction: self.direction,
            properties: self.properties.with(key, predicate),
        }
    }

    /// Returns a copy with the properties replaced.
    pub fn with_properties(&self, properties: DetachedPropertiesDescription) -> Self {
        Self {
            edge_type: self.edge_type.clone(),
            direction: self.direction,
            properties,
        }
    }

    /// Relationship type.
    pub fn edge_type(&self) -> &str {
        &self.edge_type
    }

    /// Direction relative to the owning vertex.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Property predicates.
    pub fn properties(&self) -> &DetachedPropertiesDescription {
        &self.properties
    }

    /// Whether every edge matched by `other` is matched by `self`.
    pub fn is_more_general_than(&self, other: &DetachedEdgeDescription) -> bool {
        self.edge_type == other.edge_type
            && (self.direction == Direction::Both || self.direction == other.direction)
            && self.properties.is_more_general_than(&other.properties)
    }

    /// Inverse of [`Self::is_more_general_than`].
    pub fn is_more_specific_than(&self, other: &DetachedEdgeDescription) -> bool {
        other.is_more_general_than(self)
    }

    /// Whether no edge can be matched by both descriptions.
    pub fn is_mutually_exclusive(&self, other: &DetachedEdgeDescription) -> bool {
        self.edge_type != other.edge_type
            || !self.direction.matches(other.direction)
            || self.properties.is_mutually_exclusive(&other.properties)
    }

    /// Lossless string form under a namespace prefix.
    pub fn to_prefixed_string(&self, prefix: &str) -> Result<String> {
        codec::to_prefixed_string(self, prefix)
    }

    /// Parses a string produced by [`Self::to_prefixed_string`] with the same prefix.
    pub fn from_prefixed_string(value: &str, prefix: &str) -> Result<Self> {
        codec::from_prefixed_string(value, prefix)
    }
}

impl fmt::Display for DetachedEdgeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}#{}", self.edge_type, self.direction, self.properties)
    }
}
