//! Batched parameterized INSERT of dataset rows.

use tracing::debug;

use crate::core::traits::LoadConnection;
use crate::core::value::{SqlNullType, SqlParam};
use crate::dataset::{Dataset, SemanticType, Value};
use crate::error::{LoadError, Result};
use crate::target::TableRef;
use crate::typemap::ColumnSpec;

/// User parameters available to one statement. sp_executesql takes two of
/// the 2100 RPC parameters for the statement text and declarations.
pub const MAX_PARAMS_PER_STATEMENT: usize = 2098;

/// Row constructors allowed in a single VALUES clause.
pub const MAX_ROWS_PER_VALUES: usize = 1000;

/// Rows per INSERT statement for a table of `cols` columns.
pub fn rows_per_batch(cols: usize) -> usize {
    if cols == 0 {
        return MAX_ROWS_PER_VALUES;
    }
    (MAX_PARAMS_PER_STATEMENT / cols).clamp(1, MAX_ROWS_PER_VALUES)
}

/// Build `INSERT INTO target (cols) VALUES (@P1, ...), (...)` for `rows` rows.
pub fn build_insert_sql(table: &TableRef, columns: &[ColumnSpec], rows: usize) -> String {
    let col_str = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let cols_per_row = columns.len();
    let mut param_idx = 1;
    let mut value_groups = Vec::with_capacity(rows);
    for _ in 0..rows {
        let placeholders: Vec<String> = (0..cols_per_row)
            .map(|_| {
                let p = format!("@P{}", param_idx);
                param_idx += 1;
                p
            })
            .collect();
        value_groups.push(format!("({})", placeholders.join(", ")));
    }

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table.quoted(),
        col_str,
        value_groups.join(", ")
    )
}

fn null_type_for(semantic_type: &SemanticType) -> SqlNullType {
    match semantic_type {
        SemanticType::Integer | SemanticType::Duration => SqlNullType::I64,
        SemanticType::Floating => SqlNullType::F64,
        SemanticType::Boolean => SqlNullType::Bool,
        SemanticType::Timestamp => SqlNullType::DateTime,
        SemanticType::Text | SemanticType::Other(_) => SqlNullType::String,
    }
}

/// Convert one cell into its bound parameter.
///
/// NaN becomes a NULL typed after the column. No other value is altered.
pub fn bind_value(value: &Value, semantic_type: &SemanticType) -> SqlParam {
    match value {
        Value::Null => SqlParam::Null(null_type_for(semantic_type)),
        Value::Float(f) if f.is_nan() => SqlParam::Null(SqlNullType::F64),
        Value::Float(f) => SqlParam::F64(*f),
        Value::Int(i) => SqlParam::I64(*i),
        Value::Text(s) => SqlParam::Text(s.clone()),
        Value::Bool(b) => SqlParam::Bool(*b),
        Value::Timestamp(ts) => SqlParam::DateTime(*ts),
        // only reachable when a type override accepted the column as-is
        Value::Duration(d) => SqlParam::I64(d.num_seconds()),
    }
}

/// Insert every row of `dataset` into `table`.
///
/// Rows are sent in multi-row batches. Nothing is committed here; the caller
/// owns the transaction. Returns the number of rows sent.
pub async fn insert_rows<C>(
    conn: &mut C,
    table: &TableRef,
    columns: &[ColumnSpec],
    dataset: &Dataset,
) -> Result<u64>
where
    C: LoadConnection + ?Sized,
{
    let total_rows = dataset.num_rows();
    if total_rows == 0 {
        return Ok(0);
    }

    let cols_per_row = columns.len();
    if cols_per_row > MAX_PARAMS_PER_STATEMENT {
        return Err(LoadError::insert(
            table.quoted(),
            format!(
                "{} columns exceed the {} parameters allowed per statement",
                cols_per_row, MAX_PARAMS_PER_STATEMENT
            ),
        ));
    }
    if cols_per_row != dataset.num_columns() {
        return Err(LoadError::insert(
            table.quoted(),
            format!(
                "{} column specs for a dataset of {} columns",
                cols_per_row,
                dataset.num_columns()
            ),
        ));
    }

    let batch_rows = rows_per_batch(cols_per_row);
    let semantic_types: Vec<&SemanticType> = dataset
        .columns()
        .iter()
        .map(|c| &c.semantic_type)
        .collect();

    let mut total_inserted = 0u64;
    let mut start = 0;
    while start < total_rows {
        let end = (start + batch_rows).min(total_rows);
        let rows = end - start;

        let mut params = Vec::with_capacity(rows * cols_per_row);
        for idx in start..end {
            params.extend(
                dataset
                    .row(idx)
                    .zip(&semantic_types)
                    .map(|(value, semantic_type)| bind_value(value, semantic_type)),
            );
        }

        let sql = build_insert_sql(table, columns, rows);
        conn.execute_statement(&sql, &params).await?;

        total_inserted += rows as u64;
        start = end;
    }

    debug!(
        "Inserted {} rows into {} (batch size: {})",
        total_inserted, table, batch_rows
    );

    Ok(total_inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fake::FakeConnection;
    use crate::dataset::Column;

    fn table() -> TableRef {
        TableRef::new("dbo", "sales", false).unwrap()
    }

    fn specs(names: &[&str]) -> Vec<ColumnSpec> {
        names
            .iter()
            .map(|n| ColumnSpec::new(format!("[{}]", n), "int"))
            .collect()
    }

    #[test]
    fn test_rows_per_batch_limits() {
        assert_eq!(rows_per_batch(1), 1000);
        assert_eq!(rows_per_batch(3), 699);
        assert_eq!(rows_per_batch(2098), 1);
        assert_eq!(rows_per_batch(5000), 1);
    }

    #[test]
    fn test_build_insert_sql() {
        let sql = build_insert_sql(&table(), &specs(&["a", "b"]), 2);
        assert_eq!(
            sql,
            "INSERT INTO [dbo].[sales] ([a], [b]) VALUES (@P1, @P2), (@P3, @P4)"
        );
    }

    #[test]
    fn test_bind_nan_becomes_typed_null() {
        assert_eq!(
            bind_value(&Value::Float(f64::NAN), &SemanticType::Floating),
            SqlParam::Null(SqlNullType::F64)
        );
        assert_eq!(
            bind_value(&Value::Float(f64::INFINITY), &SemanticType::Floating),
            SqlParam::F64(f64::INFINITY)
        );
    }

    #[test]
    fn test_bind_null_typed_by_column() {
        assert_eq!(
            bind_value(&Value::Null, &SemanticType::Timestamp),
            SqlParam::Null(SqlNullType::DateTime)
        );
        assert_eq!(
            bind_value(&Value::Null, &SemanticType::Other("category".into())),
            SqlParam::Null(SqlNullType::String)
        );
    }

    #[tokio::test]
    async fn test_zero_rows_sends_nothing() {
        let mut conn = FakeConnection::new("dbo").with_table("[dbo].[sales]", 0);
        let ds = Dataset::new(vec![Column::integers("a", Vec::<i64>::new())]).unwrap();
        let n = insert_rows(&mut conn, &table(), &specs(&["a"]), &ds)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_large_dataset_split_into_batches() {
        let mut conn = FakeConnection::new("dbo").with_table("[dbo].[sales]", 0);
        let ds = Dataset::new(vec![
            Column::integers("a", 0..2500),
            Column::floats("b", (0..2500).map(|i| i as f64)),
        ])
        .unwrap();
        let n = insert_rows(&mut conn, &table(), &specs(&["a", "b"]), &ds)
            .await
            .unwrap();
        assert_eq!(n, 2500);
        assert_eq!(conn.row_count("[dbo].[sales]"), 2500);
        // 2 columns: 1000 rows per statement
        assert_eq!(conn.statements().len(), 3);
        assert_eq!(
            conn.table("[dbo].[sales]").unwrap().rows[2499],
            vec![SqlParam::I64(2499), SqlParam::F64(2499.0)]
        );
    }

    #[tokio::test]
    async fn test_nan_cells_arrive_as_null() {
        let mut conn = FakeConnection::new("dbo").with_table("[dbo].[sales]", 0);
        let ds = Dataset::new(vec![Column::floats("price", [1.5, f64::NAN])]).unwrap();
        insert_rows(&mut conn, &table(), &specs(&["price"]), &ds)
            .await
            .unwrap();
        let rows = &conn.table("[dbo].[sales]").unwrap().rows;
        assert_eq!(rows[0], vec![SqlParam::F64(1.5)]);
        assert_eq!(rows[1], vec![SqlParam::Null(SqlNullType::F64)]);
    }

    #[tokio::test]
    async fn test_driver_error_propagates() {
        let mut conn = FakeConnection::new("dbo");
        let ds = Dataset::new(vec![Column::integers("a", [1])]).unwrap();
        let err = insert_rows(&mut conn, &table(), &specs(&["a"]), &ds)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Database(_)));
    }
}
