//! Identifier sanitizing, validation and quoting for SQL Server.
//!
//! SQL identifiers cannot be bound as parameters, so every column, schema and
//! table name that ends up in generated SQL goes through this module first:
//!
//! 1. [`clean_identifier`] strips parentheses and brackets, trims surrounding
//!    whitespace and turns any remaining whitespace into underscores.
//! 2. [`validate_identifier`] rejects empty names, null bytes and names over
//!    the SQL Server length limit.
//! 3. [`sanitize`] wraps the cleaned name in brackets.
//!
//! Because brackets are stripped before quoting, [`sanitize`] is a fixed
//! point: sanitizing an already sanitized name returns it unchanged.

use std::collections::HashMap;

use crate::error::{LoadError, Result};

/// SQL Server identifier length limit (characters).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Normalize a raw label into an unquoted SQL Server identifier.
pub fn clean_identifier(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect();

    stripped
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Sanitize a raw label into a bracket-quoted identifier.
///
/// ```ignore
/// assert_eq!(sanitize("Unit Price (USD)"), "[Unit_Price_USD]");
/// assert_eq!(sanitize("[Unit_Price_USD]"), "[Unit_Price_USD]");
/// ```
pub fn sanitize(name: &str) -> String {
    format!("[{}]", clean_identifier(name))
}

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoadError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(LoadError::InvalidIdentifier(format!(
            "identifier contains null byte: {:?}",
            name
        )));
    }

    let len = name.chars().count();
    if len > MAX_IDENTIFIER_LENGTH {
        return Err(LoadError::InvalidIdentifier(format!(
            "identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, len, name
        )));
    }

    Ok(())
}

/// Fail with [`LoadError::DuplicateColumns`] when two labels sanitize to the
/// same identifier, ignoring case.
///
/// Every original label involved in a collision is reported, in dataset
/// order, so the source can be fixed in one pass.
pub fn check_duplicates<S: AsRef<str>>(labels: &[S]) -> Result<()> {
    let keys: Vec<String> = labels
        .iter()
        .map(|l| clean_identifier(l.as_ref()).to_lowercase())
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in &keys {
        *counts.entry(key.as_str()).or_default() += 1;
    }

    let colliding: Vec<String> = labels
        .iter()
        .zip(&keys)
        .filter(|(_, key)| counts.get(key.as_str()).copied().unwrap_or(0) > 1)
        .map(|(label, _)| label.as_ref().to_string())
        .collect();

    if colliding.is_empty() {
        Ok(())
    } else {
        Err(LoadError::DuplicateColumns { columns: colliding })
    }
}

/// Check dataset labels before any SQL is generated from them.
///
/// Runs [`check_duplicates`], then [`validate_identifier`] on each cleaned
/// label.
pub fn check_column_names<S: AsRef<str>>(labels: &[S]) -> Result<()> {
    check_duplicates(labels)?;
    for label in labels {
        validate_identifier(&clean_identifier(label.as_ref()))?;
    }
    Ok(())
}
