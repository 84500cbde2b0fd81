//! In-memory tabular datasets.
//!
//! A [`Dataset`] is an ordered list of named, homogeneously typed columns of
//! equal length. Sources such as [`csv`] build one; the
//! loader only reads it.

pub mod csv;

use std::fmt;
use std::ops::Range;

use chrono::NaiveDateTime;

use crate::error::{LoadError, Result};

/// Logical data category of a column, independent of SQL spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Integer,
    Floating,
    Text,
    Boolean,
    Timestamp,
    /// Interval values. Must be converted to seconds before loading.
    Duration,
    /// Any other category, carried by label.
    Other(String),
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Integer => f.write_str("integer"),
            SemanticType::Floating => f.write_str("floating"),
            SemanticType::Text => f.write_str("text"),
            SemanticType::Boolean => f.write_str("boolean"),
            SemanticType::Timestamp => f.write_str("timestamp"),
            SemanticType::Duration => f.write_str("duration"),
            SemanticType::Other(label) => f.write_str(label),
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Duration(chrono::Duration),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A named column with a declared semantic type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub semantic_type: SemanticType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            values,
        }
    }

    pub fn integers(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            name,
            SemanticType::Integer,
            values.into_iter().map(Value::Int).collect(),
        )
    }

    pub fn floats(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            name,
            SemanticType::Floating,
            values.into_iter().map(Value::Float).collect(),
        )
    }

    pub fn texts<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            SemanticType::Text,
            values.into_iter().map(|s| Value::Text(s.into())).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered, rectangular collection of columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Dataset {
    /// Build a dataset, rejecting an empty column set and ragged columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let first = columns
            .first()
            .ok_or_else(|| LoadError::Dataset("dataset has no columns".to_string()))?;
        let num_rows = first.len();

        if let Some(bad) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(LoadError::Dataset(format!(
                "column {:?} has {} rows, expected {} (from column {:?})",
                bad.name,
                bad.len(),
                num_rows,
                first.name
            )));
        }

        Ok(Self { columns, num_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Iterate the cells of one row in column order.
    pub fn row(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().map(move |c| &c.values[idx])
    }

    /// Copy a contiguous range of rows into a new dataset.
    ///
    /// The range is clamped to the dataset bounds.
    pub fn slice(&self, range: Range<usize>) -> Dataset {
        let end = range.end.min(self.num_rows);
        let start = range.start.min(end);
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                semantic_type: c.semantic_type.clone(),
                values: c.values[start..end].to_vec(),
            })
            .collect();
        Dataset {
            columns,
            num_rows: end - start,
        }
    }

    /// Convert every duration column to whole seconds, typed as integer.
    ///
    /// Durations must be converted before loading:
    /// the loader rejects raw intervals.
    #[must_use]
    pub fn durations_to_seconds(mut self) -> Self {
        for column in &mut self.columns {
            if column.semantic_type != SemanticType::Duration {
                continue;
            }
            column.semantic_type = SemanticType::Integer;
            for value in &mut column.values {
                if let Value::Duration(d) = value {
                    *value = Value::Int(d.num_seconds());
                }
            }
        }
        self
    }

    /// Prepend a 1-based integer row id column.
    pub fn with_row_id(mut self, name: &str) -> Self {
        let ids = (1..=self.num_rows as i64).map(Value::Int).collect();
        self.columns
            .insert(0, Column::new(name, SemanticType::Integer, ids));
        self
    }

    /// Lowercase labels, drop punctuation and turn spaces into underscores.
    #[must_use]
    pub fn clean_labels(mut self) -> Self {
        for column in &mut self.columns {
            column.name = clean_label(&column.name);
        }
        self
    }
}

fn clean_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .replace(' ', "_")
}
