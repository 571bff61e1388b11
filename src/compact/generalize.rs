use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::description::{DetachedEdgeDescription, PropertiesDescription, PropertyPredicate};

use super::GeneralizationOrder;

/// How often the values of one property key change among the entries of one edge type.
///
/// The frequency is `changes / (type degree + 1)`, where `changes` is the number of distinct
/// non-wildcard predicates plus the degree already folded into wildcards. It is kept as a
/// fraction so ranking is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyFrequency {
    pub(crate) edge_type: String,
    pub(crate) key: String,
    changes: i64,
    type_degree: i64,
}

impl KeyFrequency {
    fn cmp_frequency(&self, other: &KeyFrequency) -> Ordering {
        let lhs = i128::from(self.changes) * i128::from(other.type_degree + 1);
        let rhs = i128::from(other.changes) * i128::from(self.type_degree + 1);
        lhs.cmp(&rhs)
    }
}

#[derive(Default)]
struct KeyStats {
    values: BTreeSet<PropertyPredicate>,
    wildcards: i64,
    descriptions: usize,
}

/// Ranks `(edge type, key)` pairs, most worth generalizing first.
pub(crate) fn rank_keys(
    entries: &BTreeMap<DetachedEdgeDescription, i64>,
    order: GeneralizationOrder,
) -> Vec<KeyFrequency> {
    let mut degree_by_type: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    let mut stats: BTreeMap<(&str, String), KeyStats> = BTreeMap::new();

    for (description, degree) in entries {
        let edge_type = description.edge_type();
        let totals = degree_by_type.entry(edge_type).or_default();
        totals.0 += degree;
        totals.1 += 1;
        for key in description.properties().keys() {
            let predicate = description.properties().get(&key);
            let slot = stats.entry((edge_type, key)).or_default();
            slot.descriptions += 1;
            if predicate == PropertyPredicate::Any {
                slot.wildcards += degree;
            } else {
                slot.values.insert(predicate);
            }
        }
    }

    let mut ranked: Vec<KeyFrequency> = stats
        .into_iter()
        .map(|((edge_type, key), mut slot)| {
            let (type_degree, type_descriptions) = degree_by_type
                .get(edge_type)
                .copied()
                .unwrap_or_default();
            if slot.descriptions < type_descriptions {
                slot.values.insert(PropertyPredicate::Undefined);
            }
            KeyFrequency {
                edge_type: edge_type.to_string(),
                key,
                changes: slot.values.len() as i64 + slot.wildcards,
                type_degree,
            }
        })
        .collect();

    match order {
        GeneralizationOrder::ChangeFrequency => ranked.sort_by(|a, b| {
            b.cmp_frequency(a)
                .then_with(|| a.edge_type.cmp(&b.edge_type))
                .then_with(|| a.key.cmp(&b.key))
        }),
        GeneralizationOrder::KeyName => ranked.sort_by(|a, b| {
            a.edge_type
                .cmp(&b.edge_type)
                .then_with(|| a.key.cmp(&b.key))
        }),
    }
    ranked
}

/// Picks a description more general than at least two entries, or `None`.
///
/// Ranked keys are tried in order. For each one the singleton key set is tried first, then
/// its union with every key set already tried for the same edge type. Within a key set the
/// generalization absorbing the most entries wins; the first one found wins ties.
pub fn produce_generalization(
    entries: &BTreeMap<DetachedEdgeDescription, i64>,
    order: GeneralizationOrder,
) -> Option<DetachedEdgeDescription> {
    let mut tried_by_type: BTreeMap<String, Vec<BTreeSet<String>>> = BTreeMap::new();

    for frequency in rank_keys(entries, order) {
        let tried = tried_by_type.entry(frequency.edge_type.clone()).or_default();
        let mut key_sets = vec![BTreeSet::from([frequency.key.clone()])];
        for previous in tried.iter() {
            let mut union = previous.clone();
            union.insert(frequency.key.clone());
            key_sets.push(union);
        }
        tried.extend(key_sets.iter().cloned());

        for key_set in &key_sets {
            if let Some(found) = best_for_key_set(entries, &frequency.edge_type, key_set) {
                return Some(found);
            }
        }
    }
    None
}

fn best_for_key_set(
    entries: &BTreeMap<DetachedEdgeDescription, i64>,
    edge_type: &str,
    key_set: &BTreeSet<String>,
) -> Option<DetachedEdgeDescription> {
    let mut best: Option<(usize, DetachedEdgeDescription)> = None;
    for candidate in entries.keys().filter(|d| d.edge_type() == edge_type) {
        let generalized = key_set.iter().fold(candidate.clone(), |desc, key| {
            desc.with(key.clone(), PropertyPredicate::Any)
        });
        let matches = entries
            .keys()
            .filter(|d| d.is_more_specific_than(&generalized))
            .count();
        let best_so_far = best.as_ref().map_or(1, |(count, _)| *count);
        if matches > best_so_far {
            best = Some((matches, generalized));
        }
    }
    best.map(|(_, description)| description)
}
