use std::fmt;

use crate::model::PropertyValue;

/// Condition placed on a single property key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyPredicate {
    /// The property is present and equal to the value.
    EqualTo(PropertyValue),
    /// Matches any value, including an absent property.
    Any,
    /// The property is absent.
    Undefined,
}

impl PropertyPredicate {
    /// Shorthand for [`PropertyPredicate::EqualTo`].
    pub fn equal_to(value: impl Into<PropertyValue>) -> Self {
        PropertyPredicate::EqualTo(value.into())
    }

    /// Whether everything matched by `other` is also matched by `self`.
    pub fn is_more_general_than(&self, other: &PropertyPredicate) -> bool {
        match (self, other) {
            (PropertyPredicate::Any, _) => true,
            (PropertyPredicate::Undefined, PropertyPredicate::Undefined) => true,
            (PropertyPredicate::EqualTo(a), PropertyPredicate::EqualTo(b)) => a == b,
            _ => false,
        }
    }

    /// Inverse of [`Self::is_more_general_than`].
    pub fn is_more_specific_than(&self, other: &PropertyPredicate) -> bool {
        other.is_more_general_than(self)
    }

    /// Whether no property state can satisfy both predicates.
    pub fn is_mutually_exclusive(&self, other: &PropertyPredicate) -> bool {
        match (self, other) {
            (PropertyPredicate::EqualTo(a), PropertyPredicate::EqualTo(b)) => a != b,
            (PropertyPredicate::EqualTo(_), PropertyPredicate::Undefined)
            | (PropertyPredicate::Undefined, PropertyPredicate::EqualTo(_)) => true,
            _ => false,
        }
    }

    /// Evaluates the predicate against an actual property state (`None` when absent).
    pub fn evaluate(&self, value: Option<&PropertyValue>) -> bool {
        match (self, value) {
            (PropertyPredicate::Any, _) => true,
            (PropertyPredicate::Undefined, None) => true,
            (PropertyPredicate::EqualTo(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for PropertyPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPredicate::EqualTo(value) => write!(f, "{value}"),
            PropertyPredicate::Any => f.write_str("ANY"),
            PropertyPredicate::Undefined => f.write_str("UNDEFINED"),
        }
    }
}
