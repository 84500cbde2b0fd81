//! DDL generation for destination tables.

use super::table::TableRef;
use crate::typemap::ColumnSpec;

/// Render the CREATE TABLE statement, one column per line.
pub fn generate_create(table: &TableRef, columns: &[ColumnSpec]) -> String {
    let col_defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.sql_type))
        .collect();

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        table.quoted(),
        col_defs.join(",\n    ")
    )
}

/// Render the DROP TABLE statement.
pub fn generate_drop(table: &TableRef) -> String {
    format!("DROP TABLE {}", table.quoted())
}
