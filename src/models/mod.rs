use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod dataset;

pub use dataset::{ColumnBindings, Dataset, DatasetError, ItemId, SetId, TransactionRow};

/// Request for suggestions given the items already in a basket
#[derive(Debug, Clone, Deserialize)]
pub struct BasketRequest {
    #[serde(default)]
    pub items: Vec<ItemId>,
    /// Selection method name; the configured default applies when absent
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Overrides the number of best neighbors kept per basket item
    #[serde(default)]
    pub neighbors_count: Option<usize>,
    /// Overrides the maximum number of suggestions
    #[serde(default)]
    pub limit: Option<usize>,
    /// Include item descriptions alongside the suggested ids
    #[serde(default)]
    pub describe: bool,
}

/// Request for suggestions to go with a single product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRequest {
    pub product_id: ItemId,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub neighbors_count: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub describe: bool,
}

impl From<ProductRequest> for BasketRequest {
    fn from(product: ProductRequest) -> Self {
        Self {
            items: vec![product.product_id],
            algorithm: product.algorithm,
            neighbors_count: product.neighbors_count,
            limit: product.limit,
            describe: product.describe,
        }
    }
}

/// Suggested items, best first
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub items: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<Vec<String>>,
    pub metadata: RecommendationMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub method: String,
    pub basket_size: usize,
    pub dataset_fingerprint: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Deserialize)]
pub struct DescribeRequest {
    pub items: Vec<ItemId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub descriptions: Vec<String>,
}

/// An item ranked by the number of sets containing it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopularItem {
    pub item_id: ItemId,
    pub description: String,
    pub set_count: usize,
    pub support: f64,
}

/// Shape of the currently loaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub source: String,
    pub columns: ColumnBindings,
    pub rows: usize,
    pub sets: usize,
    pub items: usize,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    /// Whether the last load replaced the previous snapshot's contents
    pub changed: bool,
}

impl DatasetSummary {
    pub fn of(dataset: &Dataset, source: &str, changed: bool) -> Self {
        Self {
            source: source.to_string(),
            columns: dataset.columns().clone(),
            rows: dataset.len(),
            sets: dataset.set_count(),
            items: dataset.item_ids().len(),
            fingerprint: dataset.fingerprint().to_string(),
            loaded_at: Utc::now(),
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basket_request_defaults() {
        let request: BasketRequest = serde_json::from_str(r#"{"items": ["A", "B"]}"#).unwrap();

        assert_eq!(request.items, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(request.algorithm, None);
        assert_eq!(request.neighbors_count, None);
        assert!(!request.describe);
    }

    #[test]
    fn test_empty_basket_request() {
        let request: BasketRequest = serde_json::from_str("{}").unwrap();
        assert!(request.items.is_empty());
    }

    #[test]
    fn test_product_request_to_basket() {
        let product: ProductRequest = serde_json::from_str(
            r#"{"product_id": "P001", "algorithm": "lift", "neighbors_count": 5}"#,
        )
        .unwrap();

        let basket = BasketRequest::from(product);
        assert_eq!(basket.items, vec!["P001".to_string()]);
        assert_eq!(basket.algorithm.as_deref(), Some("lift"));
        assert_eq!(basket.neighbors_count, Some(5));
        assert_eq!(basket.limit, None);
    }

    #[test]
    fn test_response_omits_descriptions_when_absent() {
        let response = RecommendationResponse {
            items: vec!["B".to_string()],
            descriptions: None,
            metadata: RecommendationMetadata {
                method: "support".to_string(),
                basket_size: 1,
                dataset_fingerprint: "abc".to_string(),
                elapsed_ms: 0,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("descriptions").is_none());
        assert_eq!(json["items"][0], "B");
        assert_eq!(json["metadata"]["method"], "support");
    }
}
