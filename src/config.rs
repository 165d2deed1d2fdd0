use serde::Deserialize;

use crate::models::ColumnBindings;
use crate::services::recommender::{Method, RecommenderConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// CSV file with transaction rows, used when no database is configured
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// PostgreSQL connection URL; takes precedence over `dataset_path`
    #[serde(default)]
    pub database_url: Option<String>,

    /// Table holding transaction rows in PostgreSQL
    #[serde(default = "default_dataset_table")]
    pub dataset_table: String,

    #[serde(default = "default_set_column")]
    pub set_column: String,

    #[serde(default = "default_item_column")]
    pub item_column: String,

    #[serde(default = "default_description_column")]
    pub description_column: String,

    /// Maximum number of suggestions returned per request
    #[serde(default = "default_n_suggestions")]
    pub n_suggestions: usize,

    /// Number of best neighbors kept per basket item
    #[serde(default = "default_n_best_neighbors")]
    pub n_best_neighbors: usize,

    /// Selection method used when a request does not name one
    #[serde(default = "default_method")]
    pub default_method: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_dataset_path() -> String {
    "data/small_sample.csv".to_string()
}

fn default_dataset_table() -> String {
    "transactions".to_string()
}

fn default_set_column() -> String {
    "order_id".to_string()
}

fn default_item_column() -> String {
    "item_id".to_string()
}

fn default_description_column() -> String {
    "description".to_string()
}

fn default_n_suggestions() -> usize {
    6
}

fn default_n_best_neighbors() -> usize {
    3
}

fn default_method() -> String {
    "support".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Column names binding the raw table to sets, items and descriptions
    pub fn column_bindings(&self) -> ColumnBindings {
        ColumnBindings {
            set_column: self.set_column.clone(),
            item_column: self.item_column.clone(),
            description_column: self.description_column.clone(),
        }
    }

    pub fn recommender_config(&self) -> RecommenderConfig {
        RecommenderConfig {
            n_suggestions: self.n_suggestions,
            n_best_neighbors: self.n_best_neighbors,
        }
    }

    /// Parses `default_method`, failing on names outside the supported set
    pub fn default_method(&self) -> anyhow::Result<Method> {
        Ok(self.default_method.parse::<Method>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(vars: Vec<(&str, &str)>) -> Config {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = config_from(vec![]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.dataset_path, "data/small_sample.csv");
        assert_eq!(config.database_url, None);
        assert_eq!(config.n_suggestions, 6);
        assert_eq!(config.n_best_neighbors, 3);
        assert_eq!(config.default_method().unwrap(), Method::Support);
    }

    #[test]
    fn test_column_bindings_from_env() {
        let config = config_from(vec![
            ("SET_COLUMN", "pedi_id"),
            ("ITEM_COLUMN", "prod_id"),
            ("DESCRIPTION_COLUMN", "prod_descricao"),
        ]);

        let columns = config.column_bindings();
        assert_eq!(columns.set_column, "pedi_id");
        assert_eq!(columns.item_column, "prod_id");
        assert_eq!(columns.description_column, "prod_descricao");
    }

    #[test]
    fn test_recommender_config_from_env() {
        let config = config_from(vec![("N_SUGGESTIONS", "10"), ("N_BEST_NEIGHBORS", "5")]);

        let recommender = config.recommender_config();
        assert_eq!(recommender.n_suggestions, 10);
        assert_eq!(recommender.n_best_neighbors, 5);
    }

    #[test]
    fn test_invalid_default_method() {
        let config = config_from(vec![("DEFAULT_METHOD", "popularity")]);

        let err = config.default_method().unwrap_err();
        assert!(err.to_string().contains("conviction"));
    }
}
