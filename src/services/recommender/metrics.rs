use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::Serialize;

use super::extractor::CoOccurrenceGraph;
use super::RecommenderError;
use crate::models::ItemId;

/// Association measure of an ordered pair (item -> neighbor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Support,
    Confidence,
    Lift,
    Leverage,
    Conviction,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Support => "support",
            Metric::Confidence => "confidence",
            Metric::Lift => "lift",
            Metric::Leverage => "leverage",
            Metric::Conviction => "conviction",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Measures of one neighbor relative to the item it was observed with
///
/// `support` is the joint support of the pair. `conviction` is `+inf` when the
/// confidence is exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NeighborMetrics {
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    pub conviction: f64,
}

impl NeighborMetrics {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Support => self.support,
            Metric::Confidence => self.confidence,
            Metric::Lift => self.lift,
            Metric::Leverage => self.leverage,
            Metric::Conviction => self.conviction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMetrics {
    pub support: f64,
    pub neighbors: BTreeMap<ItemId, NeighborMetrics>,
}

/// Support of every item plus pairwise measures for every recorded neighbor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AssociationMetrics {
    items: HashMap<ItemId, ItemMetrics>,
}

impl AssociationMetrics {
    /// Derives every measure from the raw counts of `graph`
    ///
    /// Fails with `MissingItem` when a neighbor entry refers to an item without
    /// a set count.
    pub fn compute(graph: &CoOccurrenceGraph) -> Result<Self, RecommenderError> {
        let mut items = HashMap::with_capacity(graph.item_count());

        for item_id in graph.set_counts().keys() {
            let item_support = support(graph, item_id)?;

            let mut neighbors = BTreeMap::new();
            if let Some(counts) = graph.neighbors(item_id) {
                for neighbor_id in counts.keys() {
                    neighbors.insert(
                        neighbor_id.clone(),
                        neighbor_metrics(graph, item_id, neighbor_id)?,
                    );
                }
            }

            items.insert(
                item_id.clone(),
                ItemMetrics {
                    support: item_support,
                    neighbors,
                },
            );
        }

        if let Some(orphan) = graph
            .neighbor_counts()
            .keys()
            .find(|item_id| !items.contains_key(*item_id))
        {
            return Err(RecommenderError::missing_item(orphan));
        }

        Ok(Self { items })
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemMetrics> {
        self.items.get(item_id)
    }

    pub fn items(&self) -> &HashMap<ItemId, ItemMetrics> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
impl FromIterator<(ItemId, ItemMetrics)> for AssociationMetrics {
    fn from_iter<I: IntoIterator<Item = (ItemId, ItemMetrics)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Share of sets containing `item_id`
pub fn support(graph: &CoOccurrenceGraph, item_id: &str) -> Result<f64, RecommenderError> {
    let count = graph
        .set_count(item_id)
        .ok_or_else(|| RecommenderError::missing_item(item_id))?;
    Ok(count as f64 / graph.sets_total() as f64)
}

/// Share of sets containing both items
pub fn joint_support(
    graph: &CoOccurrenceGraph,
    item_id: &str,
    neighbor_id: &str,
) -> Result<f64, RecommenderError> {
    for id in [item_id, neighbor_id] {
        if graph.set_count(id).is_none() {
            return Err(RecommenderError::missing_item(id));
        }
    }
    Ok(graph.co_occurrence(item_id, neighbor_id) as f64 / graph.sets_total() as f64)
}

/// P(neighbor | item)
pub fn confidence(joint_support: f64, item_support: f64) -> f64 {
    joint_support / item_support
}

/// Confidence relative to the neighbor's baseline probability
pub fn lift(confidence: f64, neighbor_support: f64) -> f64 {
    confidence / neighbor_support
}

/// Observed joint probability minus the one expected under independence
pub fn leverage(joint_support: f64, item_support: f64, neighbor_support: f64) -> f64 {
    joint_support - item_support * neighbor_support
}

pub fn conviction(confidence: f64, neighbor_support: f64) -> f64 {
    if confidence == 1.0 {
        f64::INFINITY
    } else {
        (1.0 - neighbor_support) / (1.0 - confidence)
    }
}

fn neighbor_metrics(
    graph: &CoOccurrenceGraph,
    item_id: &str,
    neighbor_id: &str,
) -> Result<NeighborMetrics, RecommenderError> {
    let item_support = support(graph, item_id)?;
    let neighbor_support = support(graph, neighbor_id)?;
    let joint = joint_support(graph, item_id, neighbor_id)?;
    let confidence = confidence(joint, item_support);

    Ok(NeighborMetrics {
        support: joint,
        confidence,
        lift: lift(confidence, neighbor_support),
        leverage: leverage(joint, item_support, neighbor_support),
        conviction: conviction(confidence, neighbor_support),
    })
}
