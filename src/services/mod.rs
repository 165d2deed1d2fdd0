pub mod dataset_loader;
pub mod recommender;

pub use dataset_loader::{CsvFileSource, DatasetSource, PostgresSource};
pub use recommender::{Method, Recommender, RecommenderConfig, RecommenderError};
