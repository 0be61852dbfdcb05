//! In-memory dataset registry.
//!
//! A dataset is an ordered list of records; each record is an ordered set of
//! `column -> value` cells. Rows may be sparse. Storing under an existing name
//! replaces the previous table wholesale.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::error::AnalystError;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric coercion. Unparsable text, null and non-finite numbers yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Null => return None,
            CellValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// One row. Keeps cells in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, overwriting an existing cell of the same name in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((name, value)) = access.next_entry::<String, CellValue>()? {
                    record.insert(name, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A named table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Record>,
    pub columns: Vec<String>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        let columns = discover_columns(&records);
        Self {
            name: name.into(),
            records,
            columns,
        }
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Numeric values of `column` in stored order; empty if the column is absent.
    pub fn column_values(&self, column: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.get(column))
            .filter_map(CellValue::as_number)
            .collect()
    }
}

/// Union of record keys in order of first appearance.
fn discover_columns(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.columns() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}

/// Confirmation returned by [`DatasetStore::store`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub dataset_name: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stored {} rows of financial data as '{}'. Columns: [{}]",
            self.row_count,
            self.dataset_name,
            self.columns.join(", ")
        )
    }
}

/// Registry of datasets keyed by name.
///
/// One lock guards the whole registry: a store is a single map insert, so
/// readers never observe a half-written table.
#[derive(Debug, Default)]
pub struct DatasetStore {
    datasets: RwLock<HashMap<String, Dataset>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Dataset>> {
        self.datasets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Dataset>> {
        self.datasets.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self, name: &str, records: Vec<Record>) -> StoreSummary {
        let dataset = Dataset::new(name, records);
        let summary = StoreSummary {
            dataset_name: name.to_string(),
            row_count: dataset.row_count(),
            columns: dataset.columns.clone(),
        };
        self.write().insert(name.to_string(), dataset);
        tracing::info!(
            dataset = name,
            rows = summary.row_count,
            columns = summary.columns.len(),
            "stored dataset"
        );
        summary
    }

    pub fn get_column_values(&self, name: &str, column: &str) -> Result<Vec<f64>, AnalystError> {
        let datasets = self.read();
        let dataset = datasets.get(name).ok_or_else(|| AnalystError::NotFound {
            dataset: name.to_string(),
        })?;
        Ok(dataset.column_values(column))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn columns(&self, name: &str) -> Result<Vec<String>, AnalystError> {
        self.read()
            .get(name)
            .map(|d| d.columns.clone())
            .ok_or_else(|| AnalystError::NotFound {
                dataset: name.to_string(),
            })
    }

    /// First `limit` records of `name`.
    pub fn preview(&self, name: &str, limit: usize) -> Result<Vec<Record>, AnalystError> {
        self.read()
            .get(name)
            .map(|d| d.records.iter().take(limit).cloned().collect())
            .ok_or_else(|| AnalystError::NotFound {
                dataset: name.to_string(),
            })
    }
}
