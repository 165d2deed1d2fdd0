use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::RequestId;
use crate::models::{
    BasketRequest, DatasetSummary, DescribeRequest, DescribeResponse, PopularItem,
    ProductRequest, RecommendationMetadata, RecommendationResponse,
};
use crate::services::recommender::ItemMetrics;
use crate::services::{Method, RecommenderConfig};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: usize,
}

fn default_popular_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    #[serde(default = "default_sample_count")]
    pub count: usize,
}

fn default_sample_count() -> usize {
    5
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// Package name, version and description
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
    }))
}

/// Suggests items to add to a basket
pub async fn recommend_basket(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<BasketRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = run_recommendation(&state, request_id, request).await?;
    Ok(Json(response))
}

/// Suggests items to go with a single product
pub async fn recommend_product(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ProductRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = run_recommendation(&state, request_id, request.into()).await?;
    Ok(Json(response))
}

async fn run_recommendation(
    state: &AppState,
    request_id: RequestId,
    request: BasketRequest,
) -> AppResult<RecommendationResponse> {
    let start = Instant::now();

    let method = match request.algorithm.as_deref() {
        Some(name) => name.parse::<Method>()?,
        None => state.default_method,
    };

    tracing::info!(
        request_id = %request_id,
        basket_size = request.items.len(),
        method = %method,
        "Processing recommendation request"
    );

    let recommender = state.recommender.read().await;
    if !recommender.is_prepared() {
        tracing::debug!(request_id = %request_id, "Statistics not cached, computing inline");
    }
    let defaults = recommender.config();
    let config = RecommenderConfig {
        n_suggestions: request.limit.unwrap_or(defaults.n_suggestions),
        n_best_neighbors: request.neighbors_count.unwrap_or(defaults.n_best_neighbors),
    };

    let items = {
        let mut rng = rand::rng();
        recommender.recommend_with(&request.items, method, &config, &mut rng)?
    };
    let descriptions = request.describe.then(|| recommender.describe(&items));

    let elapsed = start.elapsed();
    tracing::info!(
        request_id = %request_id,
        suggestions = items.len(),
        processing_time_ms = elapsed.as_millis(),
        "Recommendation completed"
    );

    Ok(RecommendationResponse {
        items,
        descriptions,
        metadata: RecommendationMetadata {
            method: method.to_string(),
            basket_size: request.items.len(),
            dataset_fingerprint: recommender.dataset().fingerprint().to_string(),
            elapsed_ms: elapsed.as_millis(),
        },
    })
}

/// Resolves item descriptions, preserving request order
pub async fn describe_items(
    State(state): State<AppState>,
    Json(request): Json<DescribeRequest>,
) -> Json<DescribeResponse> {
    let recommender = state.recommender.read().await;
    Json(DescribeResponse {
        descriptions: recommender.describe(&request.items),
    })
}

/// Items found in the most sets
pub async fn popular_items(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Json<Vec<PopularItem>> {
    let recommender = state.recommender.read().await;
    Json(recommender.popular_items(query.limit))
}

/// Random distinct item ids from the current dataset
pub async fn sample_items(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Json<Vec<String>> {
    let recommender = state.recommender.read().await;
    let sample = recommender
        .dataset()
        .sample_items(query.count, &mut rand::rng());
    Json(sample)
}

/// Association metrics of one item against each of its neighbors
pub async fn item_metrics(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<ItemMetrics>> {
    let recommender = state.recommender.read().await;
    recommender
        .item_metrics(&item_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item '{}' is not in the dataset", item_id)))
}

pub async fn dataset_summary(State(state): State<AppState>) -> Json<DatasetSummary> {
    Json(state.summary().await)
}

/// Reloads the dataset from the configured source
pub async fn reload_dataset(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<DatasetSummary>> {
    tracing::info!(request_id = %request_id, source = state.source.name(), "Reloading dataset");
    Ok(Json(state.reload().await?))
}

/// Replaces the dataset with a CSV request body
pub async fn upload_dataset(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> AppResult<Json<DatasetSummary>> {
    tracing::info!(request_id = %request_id, bytes = body.len(), "Replacing dataset from upload");
    Ok(Json(state.replace_from_csv(&body).await?))
}
