use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use super::metrics::{AssociationMetrics, Metric};
use super::{RecommenderConfig, RecommenderError};
use crate::models::ItemId;

/// Strategy used to merge and rank the neighbors of the basket items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Per-item best neighbors in basket order, first occurrence wins
    Arbitrary,
    /// Uniform draw from the pooled best neighbors
    Random,
    Support,
    Confidence,
    Lift,
    Leverage,
    Conviction,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Arbitrary,
        Method::Random,
        Method::Support,
        Method::Confidence,
        Method::Lift,
        Method::Leverage,
        Method::Conviction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Arbitrary => "arbitrary",
            Method::Random => "random",
            Method::Support => "support",
            Method::Confidence => "confidence",
            Method::Lift => "lift",
            Method::Leverage => "leverage",
            Method::Conviction => "conviction",
        }
    }

    /// Metric used to pick each basket item's best neighbors
    pub fn ranking_metric(&self) -> Metric {
        match self {
            Method::Arbitrary | Method::Random | Method::Support => Metric::Support,
            Method::Confidence => Metric::Confidence,
            Method::Lift => Metric::Lift,
            Method::Leverage => Metric::Leverage,
            Method::Conviction => Metric::Conviction,
        }
    }

    /// Comma-separated list of every accepted method name
    pub fn available() -> String {
        Method::ALL
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = RecommenderError;

    /// Accepts the plain names and their legacy `k_best_` prefixed forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("k_best_").unwrap_or(&name);

        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == name)
            .ok_or_else(|| RecommenderError::UnknownMethod {
                method: s.to_string(),
                available: Method::available(),
            })
    }
}

/// Ranks the neighbors of the basket items and returns up to
/// `config.n_suggestions` ids, none of them already in the basket
///
/// When a neighbor is reached from several basket items, metric-ranked methods
/// score it by the highest value observed, not the sum or the mean.
pub fn select_suggestions<R: Rng + ?Sized>(
    basket: &[ItemId],
    metrics: &AssociationMetrics,
    config: &RecommenderConfig,
    method: Method,
    rng: &mut R,
) -> Vec<ItemId> {
    if basket.is_empty() {
        return Vec::new();
    }

    let metric = method.ranking_metric();
    let pools: Vec<Vec<(&str, f64)>> = basket
        .iter()
        .map(|seed| best_neighbors(metrics, seed, metric, config.n_best_neighbors))
        .collect();
    let in_basket: HashSet<&str> = basket.iter().map(String::as_str).collect();

    let suggestions: Vec<&str> = match method {
        Method::Arbitrary => first_seen(&pools, &in_basket)
            .into_iter()
            .take(config.n_suggestions)
            .collect(),
        Method::Random => {
            let pool = first_seen(&pools, &in_basket);
            if pool.len() <= config.n_suggestions {
                pool
            } else {
                pool.choose_multiple(rng, config.n_suggestions)
                    .copied()
                    .collect()
            }
        }
        Method::Support
        | Method::Confidence
        | Method::Lift
        | Method::Leverage
        | Method::Conviction => best_evidence(&pools, &in_basket)
            .into_iter()
            .take(config.n_suggestions)
            .map(|(id, _)| id)
            .collect(),
    };

    suggestions.into_iter().map(str::to_string).collect()
}

/// The `n_best` neighbors of `seed` with the highest `metric`
///
/// Ties keep the neighbor map's order. Unknown seeds and seeds without
/// neighbors yield nothing.
pub fn best_neighbors<'a>(
    metrics: &'a AssociationMetrics,
    seed: &str,
    metric: Metric,
    n_best: usize,
) -> Vec<(&'a str, f64)> {
    let Some(item) = metrics.get(seed) else {
        return Vec::new();
    };

    let mut ranked: Vec<(&str, f64)> = item
        .neighbors
        .iter()
        .map(|(id, values)| (id.as_str(), values.value(metric)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n_best);
    ranked
}

/// Concatenates pools in basket order, keeping each id's first occurrence
fn first_seen<'a>(pools: &[Vec<(&'a str, f64)>], in_basket: &HashSet<&str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    pools
        .iter()
        .flatten()
        .map(|&(id, _)| id)
        .filter(|id| !in_basket.contains(id) && seen.insert(*id))
        .collect()
}

/// One entry per id holding its maximum value across pools, best first
fn best_evidence<'a>(
    pools: &[Vec<(&'a str, f64)>],
    in_basket: &HashSet<&str>,
) -> Vec<(&'a str, f64)> {
    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, f64> = HashMap::new();

    for &(id, value) in pools.iter().flatten() {
        if in_basket.contains(id) {
            continue;
        }
        best.entry(id)
            .and_modify(|current| *current = current.max(value))
            .or_insert_with(|| {
                order.push(id);
                value
            });
    }

    let mut merged: Vec<(&str, f64)> = order.into_iter().map(|id| (id, best[id])).collect();
    merged.sort_by(|a, b| b.1.total_cmp(&a.1));
    merged
}
