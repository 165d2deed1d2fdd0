use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while parsing transaction data
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Identifier of a set (order, transaction, basket)
pub type SetId = String;

/// Identifier of an item (product)
pub type ItemId = String;

/// Names of the source-table columns holding sets, items and descriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBindings {
    pub set_column: String,
    pub item_column: String,
    pub description_column: String,
}

/// One row of the transactional table: an item occurrence inside a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub set_id: SetId,
    pub item_id: ItemId,
    pub description: Option<String>,
}

impl TransactionRow {
    pub fn new(set_id: impl Into<SetId>, item_id: impl Into<ItemId>) -> Self {
        Self {
            set_id: set_id.into(),
            item_id: item_id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable snapshot of transaction rows
///
/// The fingerprint is a SHA-256 digest over the ordered rows. Two snapshots with
/// the same fingerprint produce the same co-occurrence statistics, so it doubles
/// as the cache key for everything derived from the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: ColumnBindings,
    rows: Vec<TransactionRow>,
    fingerprint: String,
}

impl Dataset {
    pub fn from_rows(columns: ColumnBindings, rows: Vec<TransactionRow>) -> Self {
        let fingerprint = fingerprint_rows(&rows);
        Self {
            columns,
            rows,
            fingerprint,
        }
    }

    /// Parses CSV with a header row, picking the bound columns by name
    ///
    /// Rows whose set or item cell is blank are skipped. The description column
    /// may be absent from the file entirely; blank description cells read as
    /// `None`.
    pub fn from_csv_reader<R: Read>(
        reader: R,
        columns: ColumnBindings,
    ) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let set_idx = position(&columns.set_column)
            .ok_or_else(|| missing_column(&columns.set_column, &headers))?;
        let item_idx = position(&columns.item_column)
            .ok_or_else(|| missing_column(&columns.item_column, &headers))?;
        let description_idx = position(&columns.description_column);

        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for record in reader.records() {
            let record = record?;

            let set_id = record.get(set_idx).unwrap_or_default();
            let item_id = record.get(item_idx).unwrap_or_default();
            if set_id.is_empty() || item_id.is_empty() {
                skipped += 1;
                continue;
            }

            let description = description_idx
                .and_then(|idx| record.get(idx))
                .filter(|d| !d.is_empty())
                .map(str::to_string);

            rows.push(TransactionRow {
                set_id: set_id.to_string(),
                item_id: item_id.to_string(),
                description,
            });
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Skipped CSV rows with blank set or item cells");
        }

        Ok(Self::from_rows(columns, rows))
    }

    pub fn columns(&self) -> &ColumnBindings {
        &self.columns
    }

    pub fn rows(&self) -> &[TransactionRow] {
        &self.rows
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct sets
    pub fn set_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.set_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct item ids in ascending order
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.rows
            .iter()
            .map(|row| row.item_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Item descriptions; the first row carrying an item decides its description
    pub fn descriptions(&self) -> HashMap<ItemId, String> {
        let mut descriptions = HashMap::new();
        for row in &self.rows {
            descriptions
                .entry(row.item_id.clone())
                .or_insert_with(|| row.description.clone().unwrap_or_default());
        }
        descriptions
    }

    /// Draws up to `count` distinct item ids uniformly without replacement
    pub fn sample_items<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<ItemId> {
        let item_ids = self.item_ids();
        if count >= item_ids.len() {
            return item_ids;
        }
        item_ids.choose_multiple(rng, count).cloned().collect()
    }
}

fn missing_column(name: &str, headers: &csv::StringRecord) -> DatasetError {
    DatasetError::MissingColumn {
        column: name.to_string(),
        available: headers.iter().map(str::to_string).collect(),
    }
}

fn fingerprint_rows(rows: &[TransactionRow]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.set_id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(row.item_id.as_bytes());
        hasher.update([0x1f]);
        if let Some(description) = &row.description {
            hasher.update(description.as_bytes());
        }
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}
