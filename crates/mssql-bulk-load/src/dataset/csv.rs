//! CSV dataset source.
//!
//! Reads a headed CSV file fully into memory and infers one semantic type per
//! column from its non-empty cells. Empty cells become NULL, except in
//! floating columns where they become NaN (integer columns with gaps are
//! promoted to floating), the same shape a dataframe reader would produce.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use super::{Column, Dataset, SemanticType, Value};
use crate::error::{LoadError, Result};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Options for reading a CSV file.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter byte (default: `,`).
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvOptions {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Read a CSV file into a [`Dataset`].
pub fn read_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = read_csv_from(file, options)?;
    debug!(
        "Read {} rows x {} columns from {}",
        dataset.num_rows(),
        dataset.num_columns(),
        path.display()
    );
    Ok(dataset)
}

/// Read CSV data from any reader into a [`Dataset`].
pub fn read_csv_from<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    if headers.is_empty() {
        return Err(LoadError::Dataset("CSV input has no header row".to_string()));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (cells, field) in raw.iter_mut().zip(record.iter()) {
            cells.push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();

    Dataset::new(columns)
}

fn infer_column(name: String, cells: Vec<String>) -> Column {
    let present: Vec<&str> = cells
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let has_gaps = present.len() < cells.len();

    if present.is_empty() {
        return Column::new(name, SemanticType::Text, vec![Value::Null; cells.len()]);
    }

    if present.iter().all(|s| s.parse::<i64>().is_ok()) && !has_gaps {
        let values = cells
            .iter()
            .map(|s| s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null))
            .collect();
        return Column::new(name, SemanticType::Integer, values);
    }

    if present.iter().all(|s| s.parse::<f64>().is_ok()) {
        let values = cells
            .iter()
            .map(|s| Value::Float(s.trim().parse::<f64>().unwrap_or(f64::NAN)))
            .collect();
        return Column::new(name, SemanticType::Floating, values);
    }

    if present.iter().all(|s| parse_bool(s).is_some()) {
        let values = cells
            .iter()
            .map(|s| parse_bool(s.trim()).map(Value::Bool).unwrap_or(Value::Null))
            .collect();
        return Column::new(name, SemanticType::Boolean, values);
    }

    if present.iter().all(|s| parse_timestamp(s).is_some()) {
        let values = cells
            .iter()
            .map(|s| {
                parse_timestamp(s.trim())
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null)
            })
            .collect();
        return Column::new(name, SemanticType::Timestamp, values);
    }

    let values = cells
        .into_iter()
        .map(|s| {
            if s.trim().is_empty() {
                Value::Null
            } else {
                Value::Text(s)
            }
        })
        .collect();
    Column::new(name, SemanticType::Text, values)
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read(input: &str) -> Dataset {
        read_csv_from(input.as_bytes(), &CsvOptions::default()).unwrap()
    }

    #[test]
    fn test_infers_column_types() {
        let ds = read(
            "id,price,name,active,created\n\
             1,9.5,apple,true,2024-01-02 03:04:05\n\
             2,3,pear,FALSE,2024-01-03\n",
        );
        let types: Vec<&SemanticType> = ds.columns().iter().map(|c| &c.semantic_type).collect();
        assert_eq!(
            types,
            vec![
                &SemanticType::Integer,
                &SemanticType::Floating,
                &SemanticType::Text,
                &SemanticType::Boolean,
                &SemanticType::Timestamp,
            ]
        );
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.columns()[3].values[1], Value::Bool(false));
    }

    #[test]
    fn test_integer_with_gaps_becomes_floating_nan() {
        let ds = read("qty,tag\n1,a\n,b\n3,c\n");
        let col = &ds.columns()[0];
        assert_eq!(col.semantic_type, SemanticType::Floating);
        assert!(matches!(col.values[1], Value::Float(f) if f.is_nan()));
        assert_eq!(col.values[2], Value::Float(3.0));
    }

    #[test]
    fn test_empty_text_cells_are_null() {
        let ds = read("name,n\nalice,1\n,2\n");
        assert_eq!(ds.columns()[0].values[1], Value::Null);
    }

    #[test]
    fn test_all_empty_column_is_text_nulls() {
        let ds = read("a,b\n,1\n,2\n");
        let col = &ds.columns()[0];
        assert_eq!(col.semantic_type, SemanticType::Text);
        assert!(col.values.iter().all(Value::is_null));
    }

    #[test]
    fn test_custom_delimiter() {
        let ds = read_csv_from(
            "a;b\n1;x\n".as_bytes(),
            &CsvOptions::default().with_delimiter(b';'),
        )
        .unwrap();
        assert_eq!(ds.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_ragged_record_is_csv_error() {
        let err = read_csv_from("a,b\n1,2,3\n".as_bytes(), &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn test_read_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Unit Price,qty").unwrap();
        writeln!(file, "1.25,4").unwrap();
        let ds = read_csv(file.path(), &CsvOptions::default()).unwrap();
        assert_eq!(ds.column_names(), vec!["Unit Price", "qty"]);
        assert_eq!(ds.num_rows(), 1);
    }
}
