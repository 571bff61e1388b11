use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Stable identity of a vertex in the host graph.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct VertexId(pub u64);

/// Stable identity of an edge in the host graph.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A property value stored on a vertex or an edge.
///
/// Values of different variants never compare equal, so `Int(2)` and `Float(2.0)` are
/// distinct. Floats compare by bit pattern, which gives the type a total order and lets
/// descriptions holding floats live in ordered maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
    /// Opaque byte string.
    Bytes(Vec<u8>),
}

impl PropertyValue {
    fn rank(&self) -> u8 {
        match self {
            PropertyValue::Bool(_) => 0,
            PropertyValue::Int(_) => 1,
            PropertyValue::Float(_) => 2,
            PropertyValue::String(_) => 3,
            PropertyValue::Bytes(_) => 4,
        }
    }

    /// Returns the integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Parses a loosely typed textual value: booleans, integers, floats, otherwise a string.
    pub fn parse_loose(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower == "true" {
            return PropertyValue::Bool(true);
        }
        if lower == "false" {
            return PropertyValue::Bool(false);
        }
        if let Ok(int_val) = raw.parse::<i64>() {
            return PropertyValue::Int(int_val);
        }
        if let Ok(float_val) = raw.parse::<f64>() {
            if float_val.is_finite() {
                return PropertyValue::Float(float_val);
            }
        }
        PropertyValue::String(raw.to_string())
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.cmp(b),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.to_bits().cmp(&b.to_bits()),
            (PropertyValue::String(a), PropertyValue::String(b)) => a.cmp(b),
            (PropertyValue::Bytes(a), PropertyValue::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            PropertyValue::Bool(v) => v.hash(state),
            PropertyValue::Int(v) => v.hash(state),
            PropertyValue::Float(v) => v.to_bits().hash(state),
            PropertyValue::String(v) => v.hash(state),
            PropertyValue::Bytes(v) => v.hash(state),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "{v:?}"),
            PropertyValue::Bytes(v) => write!(f, "bytes[{}]", v.len()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

/// Direction of an edge as seen from one of its vertices.
///
/// `Both` is only meaningful in queries and as an unresolved default; stored descriptions
/// always carry `Outgoing` or `Incoming`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The point-of-view vertex is the start of the edge.
    Outgoing,
    /// The point-of-view vertex is the end of the edge.
    Incoming,
    /// Either end.
    Both,
}

impl Direction {
    /// Whether two directions can describe the same edge.
    pub fn matches(self, other: Direction) -> bool {
        self == Direction::Both || other == Direction::Both || self == other
    }

    /// Whether the direction is a concrete side.
    pub fn is_resolved(self) -> bool {
        self != Direction::Both
    }

    /// Returns the opposite side; `Both` stays `Both`.
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Direction::Outgoing => "out",
            Direction::Incoming => "in",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Outgoing => "OUTGOING",
            Direction::Incoming => "INCOMING",
            Direction::Both => "BOTH",
        })
    }
}
