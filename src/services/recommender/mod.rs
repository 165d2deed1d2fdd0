//! Item-to-item recommendations from co-purchase statistics
//!
//! The pipeline runs in three stages: [`extractor`] turns transaction rows into
//! a [`CoOccurrenceGraph`], [`metrics`] derives [`AssociationMetrics`] from its
//! counts, and [`selector`] merges and ranks the neighbors of a basket. The
//! [`Recommender`] facade owns the dataset and caches the first two stages per
//! dataset fingerprint.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use rand::Rng;
use thiserror::Error;

use crate::models::{Dataset, ItemId, PopularItem};

pub mod extractor;
pub mod metrics;
pub mod selector;

pub use extractor::CoOccurrenceGraph;
pub use metrics::{AssociationMetrics, ItemMetrics, Metric, NeighborMetrics};
pub use selector::Method;

/// Error types for the recommender
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("Invalid recommender configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown method '{method}'. Available methods: {available}")]
    UnknownMethod { method: String, available: String },

    #[error("Data integrity error: item '{item_id}' has no recorded set count")]
    MissingItem { item_id: String },
}

impl RecommenderError {
    pub(crate) fn missing_item(item_id: impl Into<String>) -> Self {
        RecommenderError::MissingItem {
            item_id: item_id.into(),
        }
    }
}

/// Selection limits applied to every recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommenderConfig {
    /// Maximum number of suggested items
    pub n_suggestions: usize,
    /// Number of best neighbors kept per basket item before merging
    pub n_best_neighbors: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            n_suggestions: 6,
            n_best_neighbors: 3,
        }
    }
}

impl RecommenderConfig {
    pub fn validate(&self) -> Result<(), RecommenderError> {
        if self.n_suggestions == 0 || self.n_best_neighbors == 0 {
            return Err(RecommenderError::InvalidConfiguration(
                "number of suggestions and best neighbors must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Statistics derived from one dataset snapshot
struct Analysis {
    fingerprint: String,
    graph: Arc<CoOccurrenceGraph>,
    metrics: OnceLock<Arc<AssociationMetrics>>,
}

/// Recommends items to add to a basket from historical co-purchases
///
/// The graph is built on first use and the metrics on the first call that needs
/// them; both are reused until [`Recommender::replace_dataset`] installs a
/// snapshot with a different fingerprint.
pub struct Recommender {
    dataset: Dataset,
    config: RecommenderConfig,
    descriptions: HashMap<ItemId, String>,
    analysis: OnceLock<Analysis>,
}

impl Recommender {
    /// Validates `config` before looking at the dataset
    pub fn new(dataset: Dataset, config: RecommenderConfig) -> Result<Self, RecommenderError> {
        config.validate()?;

        let descriptions = dataset.descriptions();
        Ok(Self {
            dataset,
            config,
            descriptions,
            analysis: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Swaps in a new snapshot, returning whether its contents differ
    ///
    /// Cached statistics survive when the fingerprint is unchanged.
    pub fn replace_dataset(&mut self, dataset: Dataset) -> bool {
        if dataset.fingerprint() == self.dataset.fingerprint()
            && dataset.columns() == self.dataset.columns()
        {
            tracing::debug!(fingerprint = %dataset.fingerprint(), "Dataset unchanged, keeping cache");
            return false;
        }

        tracing::info!(
            previous = %self.dataset.fingerprint(),
            current = %dataset.fingerprint(),
            rows = dataset.len(),
            "Dataset replaced, invalidating cached statistics"
        );

        self.descriptions = dataset.descriptions();
        self.dataset = dataset;
        self.analysis = OnceLock::new();
        true
    }

    /// Co-occurrence graph of the current dataset
    pub fn graph(&self) -> Arc<CoOccurrenceGraph> {
        self.analysis().graph.clone()
    }

    /// Association metrics of every item in the current dataset
    pub fn association_metrics(&self) -> Result<Arc<AssociationMetrics>, RecommenderError> {
        let analysis = self.analysis();

        if let Some(metrics) = analysis.metrics.get() {
            return Ok(metrics.clone());
        }

        let computed = Arc::new(AssociationMetrics::compute(&analysis.graph)?);
        tracing::debug!(
            fingerprint = %analysis.fingerprint,
            items = computed.len(),
            "Association metrics computed"
        );

        Ok(analysis.metrics.get_or_init(|| computed).clone())
    }

    /// Builds the graph and metrics now instead of on the next recommendation
    pub fn prepare(&self) -> Result<(), RecommenderError> {
        self.association_metrics().map(|_| ())
    }

    /// Whether graph and metrics of the current dataset are cached
    pub fn is_prepared(&self) -> bool {
        self.analysis
            .get()
            .is_some_and(|analysis| analysis.metrics.get().is_some())
    }

    /// Metrics of a single item, `None` when the item is not in the dataset
    pub fn item_metrics(&self, item_id: &str) -> Result<Option<ItemMetrics>, RecommenderError> {
        Ok(self.association_metrics()?.get(item_id).cloned())
    }

    /// Suggests items for `basket` with the configured limits
    pub fn recommend(
        &self,
        basket: &[ItemId],
        method: Method,
    ) -> Result<Vec<ItemId>, RecommenderError> {
        self.recommend_with_rng(basket, method, &mut rand::rng())
    }

    /// Same as [`Recommender::recommend`] with a caller-supplied random source
    pub fn recommend_with_rng<R: Rng + ?Sized>(
        &self,
        basket: &[ItemId],
        method: Method,
        rng: &mut R,
    ) -> Result<Vec<ItemId>, RecommenderError> {
        self.recommend_with(basket, method, &self.config, rng)
    }

    /// Suggests items for `basket` under limits overriding the configured ones
    pub fn recommend_with<R: Rng + ?Sized>(
        &self,
        basket: &[ItemId],
        method: Method,
        config: &RecommenderConfig,
        rng: &mut R,
    ) -> Result<Vec<ItemId>, RecommenderError> {
        config.validate()?;

        if basket.is_empty() {
            return Ok(Vec::new());
        }

        if !self.analysis().graph.has_relationships() {
            tracing::debug!("Dataset has no co-occurring items");
            return Ok(Vec::new());
        }

        let metrics = self.association_metrics()?;
        let suggestions = selector::select_suggestions(basket, &metrics, config, method, rng);

        tracing::debug!(
            method = %method,
            ranking = %method.ranking_metric(),
            basket_size = basket.len(),
            suggestions = suggestions.len(),
            "Suggestions selected"
        );

        Ok(suggestions)
    }

    /// Descriptions for `item_ids` in the same order; unknown ids map to `""`
    pub fn describe(&self, item_ids: &[ItemId]) -> Vec<String> {
        item_ids
            .iter()
            .map(|id| self.descriptions.get(id).cloned().unwrap_or_default())
            .collect()
    }

    /// Items ordered by the number of sets containing them, ties by id
    pub fn popular_items(&self, limit: usize) -> Vec<PopularItem> {
        let graph = self.graph();
        let sets_total = graph.sets_total().max(1) as f64;

        let mut ranked: Vec<(&ItemId, usize)> = graph
            .set_counts()
            .iter()
            .map(|(id, count)| (id, *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        ranked
            .into_iter()
            .take(limit)
            .map(|(id, count)| PopularItem {
                item_id: id.clone(),
                description: self.descriptions.get(id).cloned().unwrap_or_default(),
                set_count: count,
                support: count as f64 / sets_total,
            })
            .collect()
    }

    fn analysis(&self) -> &Analysis {
        self.analysis.get_or_init(|| {
            let graph = CoOccurrenceGraph::from_rows(self.dataset.rows());
            tracing::debug!(
                fingerprint = %self.dataset.fingerprint(),
                sets = graph.sets_total(),
                items = graph.item_count(),
                "Co-occurrence graph built"
            );
            Analysis {
                fingerprint: self.dataset.fingerprint().to_string(),
                graph: Arc::new(graph),
                metrics: OnceLock::new(),
            }
        })
    }
}
