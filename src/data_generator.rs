//! Seeded random graphs for benchmarks and randomized tests.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::graph::MemoryGraph;
use crate::model::{PropertyValue, VertexId};

const EDGE_TYPES: [&str; 3] = ["FRIEND", "FOLLOWS", "WORKS_WITH"];
const SINCE_YEARS: std::ops::Range<i64> = 2015..2025;

/// Generates reproducible graphs.
pub struct DataGenerator {
    rng: ChaCha8Rng,
}

impl DataGenerator {
    /// Creates a generator; equal seeds give equal graphs.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Social-style graph: `num_users` vertices, each starting about `avg_connections`
    /// edges with random types and properties. Self-loops occur with a small probability.
    ///
    /// The edges are left pending on the returned graph so a module can commit them.
    pub fn generate_social_network(
        &mut self,
        num_users: usize,
        avg_connections: usize,
    ) -> (MemoryGraph, Vec<VertexId>) {
        let mut graph = MemoryGraph::new();
        let users: Vec<VertexId> = (0..num_users)
            .map(|i| {
                let props = BTreeMap::from([(
                    "name".to_string(),
                    PropertyValue::String(format!("User{}", i + 1)),
                )]);
                graph.create_vertex(props)
            })
            .collect();
        if users.is_empty() {
            return (graph, users);
        }

        for &user in &users {
            let num_connections = self.rng.gen_range(0..=avg_connections * 2);
            for _ in 0..num_connections {
                let target = if self.rng.gen_bool(0.05) {
                    user
                } else {
                    users[self.rng.gen_range(0..users.len())]
                };
                let edge_type = EDGE_TYPES.choose(&mut self.rng).copied().unwrap_or("FRIEND");
                let props = self.edge_properties();
                // Both endpoints were created above.
                let _ = graph.create_edge(user, target, edge_type, props);
            }
        }
        (graph, users)
    }

    /// Random edge properties: `since` is usually present, `strength` sometimes.
    pub fn edge_properties(&mut self) -> BTreeMap<String, PropertyValue> {
        let mut props = BTreeMap::new();
        if self.rng.gen_bool(0.9) {
            props.insert(
                "since".to_string(),
                PropertyValue::Int(self.rng.gen_range(SINCE_YEARS)),
            );
        }
        if self.rng.gen_bool(0.4) {
            props.insert(
                "strength".to_string(),
                PropertyValue::Int(self.rng.gen_range(1..4)),
            );
        }
        props
    }

    /// Picks one of `vertices`.
    pub fn pick(&mut self, vertices: &[VertexId]) -> Option<VertexId> {
        vertices.choose(&mut self.rng).copied()
    }
}
