use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ping", get(handlers::ping))
        .route("/info", get(handlers::info))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route("/recommendations/basket", post(handlers::recommend_basket))
        .route("/recommendations/product", post(handlers::recommend_product))
        // Items
        .route("/items/describe", post(handlers::describe_items))
        .route("/items/popular", get(handlers::popular_items))
        .route("/items/sample", get(handlers::sample_items))
        .route("/items/:item_id/metrics", get(handlers::item_metrics))
        // Dataset
        .route(
            "/dataset",
            get(handlers::dataset_summary).put(handlers::upload_dataset),
        )
        .route("/dataset/reload", post(handlers::reload_dataset))
}
