//! Type inference from semantic column types to SQL Server column types.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::core::identifier::{clean_identifier, sanitize};
use crate::dataset::{Column, SemanticType};
use crate::error::{LoadError, Result};

/// Destination type for any semantic type without a mapping.
pub const FALLBACK_TYPE: &str = "varchar(255)";

/// A sanitized column name and its destination type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Bracket-quoted column name.
    pub name: String,
    /// Column type as written into DDL (may carry constraints).
    pub sql_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Map a semantic type to its SQL Server spelling.
///
/// Returns `None` for types with no fixed mapping.
pub fn destination_type(semantic_type: &SemanticType) -> Option<&'static str> {
    match semantic_type {
        SemanticType::Integer => Some("int"),
        SemanticType::Floating => Some("float"),
        SemanticType::Text => Some("varchar(max)"),
        SemanticType::Boolean => Some("bit"),
        SemanticType::Timestamp => Some("datetime2"),
        SemanticType::Duration | SemanticType::Other(_) => None,
    }
}

/// Re-key caller overrides by sanitized column name.
///
/// Fails with [`LoadError::CustomColumn`] listing every override whose key
/// matches no column, or that shares its column with another key.
pub fn clean_overrides(
    columns: &[Column],
    overrides: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    let known: Vec<String> = columns
        .iter()
        .map(|c| clean_identifier(&c.name))
        .collect();

    let mut by_column: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    let mut rejected = Vec::new();
    for key in overrides.keys() {
        let clean = clean_identifier(key);
        if known.iter().any(|k| *k == clean) {
            by_column.entry(clean).or_default().push(key);
        } else {
            rejected.push(key.clone());
        }
    }

    let mut cleaned = HashMap::with_capacity(by_column.len());
    for (clean, keys) in by_column {
        match keys.as_slice() {
            [key] => {
                cleaned.insert(clean, overrides[*key].clone());
            }
            _ => rejected.extend(keys.into_iter().cloned()),
        }
    }

    if rejected.is_empty() {
        Ok(cleaned)
    } else {
        rejected.sort();
        Err(LoadError::CustomColumn { columns: rejected })
    }
}

/// Resolve one [`ColumnSpec`] per column, in dataset order.
///
/// Overrides win verbatim. Otherwise the semantic type is mapped, falling
/// back to [`FALLBACK_TYPE`]. Columns still declared as durations are
/// rejected: they must arrive as numeric seconds.
pub fn infer_types(
    columns: &[Column],
    overrides: &HashMap<String, String>,
) -> Result<Vec<ColumnSpec>> {
    let overrides = clean_overrides(columns, overrides)?;

    columns
        .iter()
        .map(|col| {
            let clean = clean_identifier(&col.name);
            if let Some(sql_type) = overrides.get(&clean) {
                debug!("Column {}: using override type {}", col.name, sql_type);
                return Ok(ColumnSpec::new(sanitize(&col.name), sql_type.clone()));
            }

            if col.semantic_type == SemanticType::Duration {
                return Err(LoadError::UnconvertedDuration {
                    column: col.name.clone(),
                });
            }

            let sql_type = destination_type(&col.semantic_type).unwrap_or_else(|| {
                debug!(
                    "Column {}: no mapping for type {}, using {}",
                    col.name, col.semantic_type, FALLBACK_TYPE
                );
                FALLBACK_TYPE
            });
            Ok(ColumnSpec::new(sanitize(&col.name), sql_type))
        })
        .collect()
}
