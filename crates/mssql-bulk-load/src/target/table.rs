//! Destination table references and schema resolution.

use std::fmt;

use tracing::debug;

use crate::core::identifier::{clean_identifier, validate_identifier};
use crate::core::traits::LoadConnection;
use crate::error::{LoadError, Result};

const DEFAULT_SCHEMA_QUERY: &str = "SELECT SCHEMA_NAME()";

/// A resolved destination table.
///
/// Schema and table are stored sanitized and unquoted. Temporary tables are
/// connection-scoped `#` tables and render without a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
    pub temporary: bool,
}

impl TableRef {
    /// Sanitize and validate the parts of a table reference.
    pub fn new(schema: &str, table: &str, temporary: bool) -> Result<Self> {
        let schema = clean_identifier(schema);
        validate_identifier(&schema)?;
        let table = clean_table_name(table, temporary)?;
        Ok(Self {
            schema,
            table,
            temporary,
        })
    }

    /// Session name of the temporary table (`#table`).
    pub fn temp_name(&self) -> String {
        format!("#{}", self.table)
    }

    /// Quoted name as used in statements: `[schema].[table]` or `[#table]`.
    pub fn quoted(&self) -> String {
        if self.temporary {
            format!("[{}]", self.temp_name())
        } else {
            format!("[{}].[{}]", self.schema, self.table)
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

fn clean_table_name(table: &str, temporary: bool) -> Result<String> {
    let mut table = clean_identifier(table);
    if temporary {
        table = table.trim_start_matches('#').to_string();
    }
    validate_identifier(&table)?;
    Ok(table)
}

/// Split `schema.table` on the first separator.
///
/// Everything after the first `.` belongs to the table name. Returns `None`
/// for the schema when there is no separator or the schema part is blank.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) if !schema.trim().is_empty() => (Some(schema), table),
        Some((_, table)) => (None, table),
        None => (None, name),
    }
}

/// Resolves table references for a single load call.
///
/// The connection's default schema is looked up at most once per resolver.
/// A resolver must not outlive the call it was created for, since another
/// connection may have a different default.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    default_schema: Option<String>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection's current default schema.
    pub async fn default_schema<C>(&mut self, conn: &mut C) -> Result<String>
    where
        C: LoadConnection + ?Sized,
    {
        if let Some(schema) = &self.default_schema {
            return Ok(schema.clone());
        }

        let schema = conn
            .query_text(DEFAULT_SCHEMA_QUERY)
            .await?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                LoadError::from(tiberius::error::Error::Protocol(
                    "connection did not report a default schema".into(),
                ))
            })?;
        debug!("Default schema for this connection: {}", schema);
        self.default_schema = Some(schema.clone());
        Ok(schema)
    }

    /// Resolve a possibly schema-qualified name into a [`TableRef`].
    pub async fn resolve<C>(
        &mut self,
        qualified: &str,
        temporary: bool,
        conn: &mut C,
    ) -> Result<TableRef>
    where
        C: LoadConnection + ?Sized,
    {
        let (schema, table) = split_qualified(qualified);
        // reject a bad table name before touching the connection
        clean_table_name(table, temporary)?;
        let schema = match schema {
            Some(s) => s.to_string(),
            None => self.default_schema(conn).await?,
        };
        TableRef::new(&schema, table, temporary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fake::FakeConnection;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("sales"), (None, "sales"));
        assert_eq!(split_qualified("dbo.sales"), (Some("dbo"), "sales"));
        assert_eq!(split_qualified("stage.sales.2024"), (Some("stage"), "sales.2024"));
        assert_eq!(split_qualified(".sales"), (None, "sales"));
    }

    #[test]
    fn test_table_ref_rendering() {
        let t = TableRef::new("dbo", "daily sales", false).unwrap();
        assert_eq!(t.quoted(), "[dbo].[daily_sales]");

        let tmp = TableRef::new("dbo", "#scratch", true).unwrap();
        assert_eq!(tmp.quoted(), "[#scratch]");
        assert_eq!(tmp.temp_name(), "#scratch");
        assert_eq!(tmp.to_string(), "[#scratch]");
    }

    #[test]
    fn test_table_ref_rejects_empty_table() {
        assert!(matches!(
            TableRef::new("dbo", "()", false),
            Err(LoadError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_explicit_schema_skips_query() {
        let mut conn = FakeConnection::new("dbo");
        let mut resolver = SchemaResolver::new();
        let t = resolver.resolve("stage.sales", false, &mut conn).await.unwrap();
        assert_eq!(t, TableRef::new("stage", "sales", false).unwrap());
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_uses_default_schema_once() {
        let mut conn = FakeConnection::new("analytics");
        let mut resolver = SchemaResolver::new();
        let a = resolver.resolve("sales", false, &mut conn).await.unwrap();
        let b = resolver.resolve("returns", false, &mut conn).await.unwrap();
        assert_eq!(a.schema, "analytics");
        assert_eq!(b.schema, "analytics");
        assert_eq!(conn.statements(), vec![DEFAULT_SCHEMA_QUERY.to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_name_without_querying() {
        let mut conn = FakeConnection::new("dbo");
        let err = SchemaResolver::new()
            .resolve("#", true, &mut conn)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(_)));
        assert!(conn.statements().is_empty());
    }

    #[tokio::test]
    async fn test_missing_default_schema_is_database_error() {
        let mut conn = FakeConnection::new("");
        let err = SchemaResolver::new()
            .resolve("sales", false, &mut conn)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Database(_)));
        assert!(!err.is_input_error());
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn test_resolve_keeps_dots_in_table_name() {
        let mut conn = FakeConnection::new("dbo");
        let t = SchemaResolver::new()
            .resolve("stage.sales.2024", false, &mut conn)
            .await
            .unwrap();
        assert_eq!(t.quoted(), "[stage].[sales.2024]");
    }
}
