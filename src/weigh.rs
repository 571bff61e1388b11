//! Edge weights for weighted degrees.

use std::fmt::Debug;

use crate::error::{DegreeCacheError, Result};
use crate::graph::GraphEdge;
use crate::model::{PropertyValue, VertexId};

/// Computes the weight an edge contributes to the degree of `point_of_view`.
pub trait WeighingStrategy: Send + Sync + Debug {
    /// Weight of `edge` seen from `point_of_view`.
    fn weight(&self, edge: &dyn GraphEdge, point_of_view: VertexId) -> i64;
}

/// Weighs `edge` with `strategy`, rejecting negative weights.
///
/// Filtered edges are weighed through their unfiltered view.
pub fn checked_weight(
    strategy: &dyn WeighingStrategy,
    edge: &dyn GraphEdge,
    point_of_view: VertexId,
) -> Result<i64> {
    let source = edge.unfiltered().unwrap_or(edge);
    let weight = strategy.weight(source, point_of_view);
    if weight < 0 {
        return Err(DegreeCacheError::InvalidArgument(format!(
            "edge {} has negative weight {weight}",
            edge.id()
        )));
    }
    Ok(weight)
}

/// Every edge weighs one.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneForEach;

impl WeighingStrategy for OneForEach {
    fn weight(&self, _edge: &dyn GraphEdge, _point_of_view: VertexId) -> i64 {
        1
    }
}

/// Weight read from an integer edge property, `default` when absent or not an integer.
#[derive(Debug, Clone)]
pub struct PropertyWeight {
    key: String,
    default: i64,
}

impl PropertyWeight {
    /// Weighs edges by the integer property `key`.
    pub fn new(key: impl Into<String>, default: i64) -> Self {
        Self {
            key: key.into(),
            default,
        }
    }
}

impl WeighingStrategy for PropertyWeight {
    fn weight(&self, edge: &dyn GraphEdge, _point_of_view: VertexId) -> i64 {
        match edge.property(&self.key) {
            Some(PropertyValue::Int(weight)) => weight,
            _ => self.default,
        }
    }
}
