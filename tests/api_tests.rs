use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use basket_api::api::{create_router, AppState};
use basket_api::error::AppResult;
use basket_api::models::{ColumnBindings, Dataset, TransactionRow};
use basket_api::services::{DatasetSource, Method, Recommender, RecommenderConfig};

/// Serves a fixed set of rows
struct StaticSource {
    rows: Vec<TransactionRow>,
}

#[async_trait::async_trait]
impl DatasetSource for StaticSource {
    async fn load(&self, columns: &ColumnBindings) -> AppResult<Dataset> {
        Ok(Dataset::from_rows(columns.clone(), self.rows.clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn columns() -> ColumnBindings {
    ColumnBindings {
        set_column: "order_id".to_string(),
        item_column: "item_id".to_string(),
        description_column: "description".to_string(),
    }
}

// Sets {1:[A,B,C], 2:[A,B], 3:[A]}
fn scenario_rows() -> Vec<TransactionRow> {
    vec![
        TransactionRow::new("1", "A").with_description("Apples"),
        TransactionRow::new("1", "B").with_description("Bread"),
        TransactionRow::new("1", "C").with_description("Cheese"),
        TransactionRow::new("2", "A").with_description("Apples"),
        TransactionRow::new("2", "B").with_description("Bread"),
        TransactionRow::new("3", "A").with_description("Apples"),
    ]
}

fn create_test_server_with(rows: Vec<TransactionRow>, source_rows: Vec<TransactionRow>) -> TestServer {
    let dataset = Dataset::from_rows(columns(), rows);
    let recommender = Recommender::new(dataset, RecommenderConfig::default()).unwrap();
    let source = Arc::new(StaticSource { rows: source_rows });
    let state = AppState::new(recommender, source, Method::Support);
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn create_test_server() -> TestServer {
    create_test_server_with(scenario_rows(), scenario_rows())
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_ping_and_info() {
    let server = create_test_server();

    let response = server.get("/ping").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "pong" }));

    let response = server.get("/info").await;
    response.assert_status_ok();
    let info: Value = response.json();
    assert_eq!(info["name"], "basket-api");
    assert!(info["version"].is_string());
}

#[tokio::test]
async fn test_basket_recommendation_by_support() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({
            "items": ["A"],
            "algorithm": "support",
            "neighbors_count": 2
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"], json!(["B", "C"]));
    assert_eq!(body["metadata"]["method"], "support");
    assert_eq!(body["metadata"]["basket_size"], 1);
    assert!(body.get("descriptions").is_none());
}

#[tokio::test]
async fn test_basket_recommendation_with_descriptions_and_limit() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({
            "items": ["A"],
            "algorithm": "k_best_support",
            "limit": 1,
            "describe": true
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"], json!(["B"]));
    assert_eq!(body["descriptions"], json!(["Bread"]));
}

#[tokio::test]
async fn test_empty_basket_returns_no_items() {
    let server = create_test_server();

    for method in Method::ALL {
        let response = server
            .post("/api/v1/recommendations/basket")
            .json(&json!({ "items": [], "algorithm": method.as_str() }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["items"], json!([]));
    }
}

#[tokio::test]
async fn test_recommendations_never_include_basket_items() {
    let server = create_test_server();

    for method in Method::ALL {
        let response = server
            .post("/api/v1/recommendations/basket")
            .json(&json!({ "items": ["A", "B"], "algorithm": method.as_str() }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let items = body["items"].as_array().unwrap();
        assert!(items.iter().all(|item| item != "A" && item != "B"));
        assert!(items.len() <= 6);
    }
}

#[tokio::test]
async fn test_unknown_method_is_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({ "items": ["A"], "algorithm": "popularity" }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("popularity"));
    assert!(message.contains("lift"));
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({ "items": ["A"], "limit": 0 }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_product_recommendation() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations/product")
        .json(&json!({ "product_id": "C", "algorithm": "confidence" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.contains(&json!("A")));
    assert!(items.contains(&json!("B")));
}

#[tokio::test]
async fn test_describe_items_preserves_order() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/items/describe")
        .json(&json!({ "items": ["C", "Z", "A"] }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "descriptions": ["Cheese", "", "Apples"] }));
}

#[tokio::test]
async fn test_popular_items() {
    let server = create_test_server();

    let response = server.get("/api/v1/items/popular?limit=2").await;

    response.assert_status_ok();
    let items: Vec<Value> = response.json();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["item_id"], "A");
    assert_eq!(items[0]["set_count"], 3);
    assert_eq!(items[0]["support"], 1.0);
    assert_eq!(items[1]["item_id"], "B");
}

#[tokio::test]
async fn test_sample_items_are_distinct_and_known() {
    let server = create_test_server();

    let response = server.get("/api/v1/items/sample?count=2").await;

    response.assert_status_ok();
    let items: Vec<String> = response.json();
    assert_eq!(items.len(), 2);
    assert_ne!(items[0], items[1]);
    assert!(items.iter().all(|id| ["A", "B", "C"].contains(&id.as_str())));
}

#[tokio::test]
async fn test_item_metrics() {
    let server = create_test_server();

    let response = server.get("/api/v1/items/A/metrics").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["support"], 1.0);
    let to_b = &body["neighbors"]["B"];
    assert!((to_b["confidence"].as_f64().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    assert!((to_b["lift"].as_f64().unwrap() - 1.0).abs() < 1e-9);

    let response = server.get("/api/v1/items/Z/metrics").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_dataset_summary() {
    let server = create_test_server();

    let response = server.get("/api/v1/dataset").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["source"], "static");
    assert_eq!(body["rows"], 6);
    assert_eq!(body["sets"], 3);
    assert_eq!(body["items"], 3);
}

#[tokio::test]
async fn test_reload_picks_up_source_changes() {
    let server = create_test_server_with(
        scenario_rows(),
        vec![
            TransactionRow::new("9", "A"),
            TransactionRow::new("9", "D"),
        ],
    );

    let response = server.post("/api/v1/dataset/reload").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["changed"], true);
    assert_eq!(body["sets"], 1);

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({ "items": ["A"] }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["items"], json!(["D"]));
}

#[tokio::test]
async fn test_upload_replaces_dataset() {
    let server = create_test_server();

    let before: Value = server.get("/api/v1/dataset").await.json();

    let response = server
        .put("/api/v1/dataset")
        .text("order_id,item_id,description\n1,A,Apples\n1,E,Eggs\n2,E,Eggs\n")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["source"], "upload");
    assert_eq!(body["changed"], true);
    assert_ne!(body["fingerprint"], before["fingerprint"]);

    let response = server
        .post("/api/v1/recommendations/basket")
        .json(&json!({ "items": ["A"], "describe": true }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["items"], json!(["E"]));
    assert_eq!(body["descriptions"], json!(["Eggs"]));
}

#[tokio::test]
async fn test_upload_with_missing_column_is_rejected() {
    let server = create_test_server();

    let response = server
        .put("/api/v1/dataset")
        .text("basket,product\n1,A\n")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("order_id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let request_id = "5f0c8f7e-2d7b-4c1a-9e3f-0a1b2c3d4e5f";

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(request_id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), request_id);

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
