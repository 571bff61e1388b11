use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::graph::PropertyContainer;

use super::predicate::PropertyPredicate;

/// A set of per-key predicates, partially ordered by generality.
///
/// Comparisons walk the union of both sides' explicit keys; a key missing on one side is
/// compared through that side's default for absent keys.
pub trait PropertiesDescription {
    /// Predicate for `key`; never fails, absent keys resolve through the default policy.
    fn get(&self, key: &str) -> PropertyPredicate;

    /// Keys with an explicit predicate.
    fn keys(&self) -> Vec<String>;

    /// Predicate of every key outside [`Self::keys`].
    fn absent_predicate(&self) -> PropertyPredicate {
        PropertyPredicate::Undefined
    }

    /// True when every key resolves to [`PropertyPredicate::Any`].
    fn matches_everything(&self) -> bool {
        false
    }

    /// Whether every property state matched by `other` is matched by `self`.
    fn is_more_general_than(&self, other: &dyn PropertiesDescription) -> bool {
        if self.matches_everything() {
            return true;
        }
        self.absent_predicate()
            .is_more_general_than(&other.absent_predicate())
            && union_keys(&self.keys(), &other.keys())
                .iter()
                .all(|key| self.get(key).is_more_general_than(&other.get(key)))
    }

    /// Inverse of [`Self::is_more_general_than`].
    fn is_more_specific_than(&self, other: &dyn PropertiesDescription) -> bool {
        if other.matches_everything() {
            return true;
        }
        other
            .absent_predicate()
            .is_more_general_than(&self.absent_predicate())
            && union_keys(&self.keys(), &other.keys())
                .iter()
                .all(|key| other.get(key).is_more_general_than(&self.get(key)))
    }

    /// Whether no property state can satisfy both descriptions.
    fn is_mutually_exclusive(&self, other: &dyn PropertiesDescription) -> bool {
        union_keys(&self.keys(), &other.keys())
            .iter()
            .any(|key| self.get(key).is_mutually_exclusive(&other.get(key)))
    }
}

fn union_keys(left: &[String], right: &[String]) -> BTreeSet<String> {
    left.iter().chain(right.iter()).cloned().collect()
}

/// Live view over a vertex or edge. Nothing is copied; predicates are computed on demand.
pub struct LazyPropertiesDescription<'a> {
    source: &'a dyn PropertyContainer,
}

impl<'a> LazyPropertiesDescription<'a> {
    /// Wraps a live property container.
    pub fn new(source: &'a dyn PropertyContainer) -> Self {
        Self { source }
    }
}

impl PropertiesDescription for LazyPropertiesDescription<'_> {
    fn get(&self, key: &str) -> PropertyPredicate {
        match self.source.property(key) {
            Some(value) => PropertyPredicate::EqualTo(value),
            None => PropertyPredicate::Undefined,
        }
    }

    fn keys(&self) -> Vec<String> {
        self.source.property_keys()
    }
}

/// What a detached description answers for keys it holds no predicate for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbsentKeys {
    /// Literal flavor: unknown keys are absent properties.
    Undefined,
    /// Wildcard flavor: unknown keys match anything.
    Any,
}

impl AbsentKeys {
    fn predicate(self) -> PropertyPredicate {
        match self {
            AbsentKeys::Undefined => PropertyPredicate::Undefined,
            AbsentKeys::Any => PropertyPredicate::Any,
        }
    }
}

/// Immutable, self-contained properties description.
///
/// Equality and hashing are structural over the predicate map and the absent-key default.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DetachedPropertiesDescription {
    absent: AbsentKeys,
    predicates: BTreeMap<String, PropertyPredicate>,
}

impl DetachedPropertiesDescription {
    /// Creates a description from explicit predicates.
    pub fn from_predicates(
        absent: AbsentKeys,
        predicates: BTreeMap<String, PropertyPredicate>,
    ) -> Self {
        Self { absent, predicates }
    }

    /// Empty literal description: matches only property-less containers.
    pub fn literal() -> Self {
        Self::from_predicates(AbsentKeys::Undefined, BTreeMap::new())
    }

    /// Empty wildcard description: matches everything.
    pub fn wildcard() -> Self {
        Self::from_predicates(AbsentKeys::Any, BTreeMap::new())
    }

    /// Literal snapshot of a container's current properties.
    pub fn literal_of<C: PropertyContainer + ?Sized>(source: &C) -> Self {
        Self::from_predicates(AbsentKeys::Undefined, snapshot(source))
    }

    /// Wildcard snapshot of a container's current properties.
    pub fn wildcard_of<C: PropertyContainer + ?Sized>(source: &C) -> Self {
        Self::from_predicates(AbsentKeys::Any, snapshot(source))
    }

    /// Returns a copy with `key` constrained by `predicate`.
    pub fn with(&self, key: impl Into<String>, predicate: PropertyPredicate) -> Self {
        let mut predicates = self.predicates.clone();
        predicates.insert(key.into(), predicate);
        Self {
            absent: self.absent,
            predicates,
        }
    }

    /// Default used for keys without an explicit predicate.
    pub fn absent_keys(&self) -> AbsentKeys {
        self.absent
    }

    /// Explicit predicates ordered by key.
    pub fn predicates(&self) -> &BTreeMap<String, PropertyPredicate> {
        &self.predicates
    }
}

fn snapshot<C: PropertyContainer + ?Sized>(source: &C) -> BTreeMap<String, PropertyPredicate> {
    source
        .property_keys()
        .into_iter()
        .filter_map(|key| {
            source
                .property(&key)
                .map(|value| (key, PropertyPredicate::EqualTo(value)))
        })
        .collect()
}

impl PropertiesDescription for DetachedPropertiesDescription {
    fn get(&self, key: &str) -> PropertyPredicate {
        self.predicates
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.absent.predicate())
    }

    fn keys(&self) -> Vec<String> {
        self.predicates.keys().cloned().collect()
    }

    fn absent_predicate(&self) -> PropertyPredicate {
        self.absent.predicate()
    }

    fn matches_everything(&self) -> bool {
        self.absent == AbsentKeys::Any
            && self
                .predicates
                .values()
                .all(|predicate| *predicate == PropertyPredicate::Any)
    }
}

impl fmt::Display for DetachedPropertiesDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavor = match self.absent {
            AbsentKeys::Undefined => "literal",
            AbsentKeys::Any => "wildcard",
        };
        write!(f, "{flavor}{{")?;
        for (idx, (key, predicate)) in self.predicates.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {predicate}")?;
        }
        f.write_str("}")
    }
}
