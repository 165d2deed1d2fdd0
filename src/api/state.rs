use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{Dataset, DatasetSummary};
use crate::services::{DatasetSource, Method, Recommender};

/// Shared application state
///
/// Recommendations take the read side of the lock; dataset replacement takes
/// the write side, so a snapshot never changes under a running computation.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RwLock<Recommender>>,
    pub source: Arc<dyn DatasetSource>,
    pub default_method: Method,
    summary: Arc<RwLock<DatasetSummary>>,
}

impl AppState {
    pub fn new(
        recommender: Recommender,
        source: Arc<dyn DatasetSource>,
        default_method: Method,
    ) -> Self {
        let summary = DatasetSummary::of(recommender.dataset(), source.name(), true);

        Self {
            recommender: Arc::new(RwLock::new(recommender)),
            source,
            default_method,
            summary: Arc::new(RwLock::new(summary)),
        }
    }

    /// Summary of the dataset currently served
    pub async fn summary(&self) -> DatasetSummary {
        self.summary.read().await.clone()
    }

    /// Reloads the dataset from the configured source
    pub async fn reload(&self) -> AppResult<DatasetSummary> {
        let columns = self.recommender.read().await.dataset().columns().clone();
        let dataset = self.source.load(&columns).await?;
        self.install(dataset, self.source.name()).await
    }

    /// Replaces the dataset with CSV content supplied by a client
    pub async fn replace_from_csv(&self, body: &[u8]) -> AppResult<DatasetSummary> {
        if body.is_empty() {
            return Err(AppError::InvalidInput("Dataset body is empty".to_string()));
        }

        let columns = self.recommender.read().await.dataset().columns().clone();
        let dataset = Dataset::from_csv_reader(body, columns)?;
        self.install(dataset, "upload").await
    }

    /// Swaps in `dataset`, warms its statistics and records its summary
    ///
    /// All three happen under the recommender write guard, so the summary
    /// always describes the dataset being served. The work runs on the
    /// blocking pool since building the statistics is CPU-bound.
    async fn install(&self, dataset: Dataset, source: &str) -> AppResult<DatasetSummary> {
        let recommender = self.recommender.clone();
        let summary_slot = self.summary.clone();
        let source = source.to_string();

        let summary = tokio::task::spawn_blocking(move || {
            let mut recommender = recommender.blocking_write();
            let changed = recommender.replace_dataset(dataset);

            if let Err(e) = recommender.prepare() {
                tracing::warn!(error = %e, "Failed to precompute association metrics");
            }

            let summary = DatasetSummary::of(recommender.dataset(), &source, changed);
            *summary_slot.blocking_write() = summary.clone();
            summary
        })
        .await
        .map_err(|e| AppError::Internal(format!("Dataset install task failed: {}", e)))?;

        tracing::info!(
            source = %summary.source,
            rows = summary.rows,
            sets = summary.sets,
            changed = summary.changed,
            "Dataset installed"
        );

        Ok(summary)
    }
}
