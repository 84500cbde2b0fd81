//! In-memory [`LoadConnection`] used by unit tests.
//!
//! Understands just enough of the statements the loader emits to track which
//! tables exist, what DDL created them and which rows were inserted.
//! Transactions snapshot the table map on BEGIN and restore it on ROLLBACK.

use std::collections::HashMap;

use async_trait::async_trait;

use super::traits::LoadConnection;
use super::value::SqlParam;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTable {
    pub ddl: String,
    pub rows: Vec<Vec<SqlParam>>,
}

#[derive(Debug, Default)]
pub(crate) struct FakeConnection {
    default_schema: String,
    tables: HashMap<String, FakeTable>,
    statements: Vec<String>,
    snapshot: Option<HashMap<String, FakeTable>>,
    commits: usize,
    rollbacks: usize,
    inserts_before_failure: Option<usize>,
    fail_commits: bool,
}

fn protocol_error(msg: impl Into<String>) -> crate::error::LoadError {
    tiberius::error::Error::Protocol(msg.into().into()).into()
}

impl FakeConnection {
    pub fn new(default_schema: &str) -> Self {
        Self {
            default_schema: default_schema.to_string(),
            ..Default::default()
        }
    }

    /// Pre-create a table under its rendered name (`[dbo].[t]` or `[#t]`).
    pub fn with_table(mut self, key: &str, rows: usize) -> Self {
        self.tables.insert(
            key.to_string(),
            FakeTable {
                ddl: format!("CREATE TABLE {} (existing)", key),
                rows: vec![Vec::new(); rows],
            },
        );
        self
    }

    /// Fail every INSERT after the first `n` succeed.
    pub fn fail_inserts_after(mut self, n: usize) -> Self {
        self.inserts_before_failure = Some(n);
        self
    }

    /// Fail every COMMIT, leaving the transaction open.
    pub fn fail_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.clone()
    }

    pub fn table(&self, key: &str) -> Option<&FakeTable> {
        self.tables.get(key)
    }

    pub fn row_count(&self, key: &str) -> usize {
        self.tables.get(key).map_or(0, |t| t.rows.len())
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }
}

fn text(param: &SqlParam) -> &str {
    match param {
        SqlParam::Text(s) => s,
        _ => "",
    }
}

/// Extract the target between a statement prefix and the following ` (`.
fn target_after<'a>(sql: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = sql.strip_prefix(prefix)?;
    Some(rest.split(" (").next().unwrap_or(rest).trim())
}

#[async_trait]
impl LoadConnection for FakeConnection {
    async fn query_text(&mut self, sql: &str) -> Result<Option<String>> {
        self.statements.push(sql.to_string());
        if sql.contains("SCHEMA_NAME()") {
            Ok(Some(self.default_schema.clone()))
        } else {
            Ok(None)
        }
    }

    async fn query_flag(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool> {
        self.statements.push(sql.to_string());
        let key = match params {
            [schema, table] => format!("[{}].[{}]", text(schema), text(table)),
            [temp] => format!("[{}]", text(temp)),
            _ => return Err(protocol_error("unexpected existence parameters")),
        };
        Ok(self.tables.contains_key(&key))
    }

    async fn execute_statement(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.statements.push(sql.to_string());
        let target = target_after(sql, "INSERT INTO ")
            .ok_or_else(|| protocol_error(format!("unsupported statement: {}", sql)))?
            .to_string();

        if let Some(remaining) = self.inserts_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(protocol_error("injected insert failure"));
            }
            *remaining -= 1;
        }

        let column_list = sql
            .split_once(" (")
            .and_then(|(_, rest)| rest.split_once(") VALUES"))
            .map(|(cols, _)| cols)
            .ok_or_else(|| protocol_error("INSERT without column list"))?;
        let width = column_list.split(", ").count();

        let table = self
            .tables
            .get_mut(&target)
            .ok_or_else(|| protocol_error(format!("Invalid object name '{}'", target)))?;
        for row in params.chunks(width) {
            table.rows.push(row.to_vec());
        }
        Ok((params.len() / width) as u64)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());

        if sql == "BEGIN TRANSACTION" {
            self.snapshot = Some(self.tables.clone());
        } else if sql == "COMMIT TRANSACTION" {
            if self.fail_commits {
                return Err(protocol_error("injected commit failure"));
            }
            self.snapshot = None;
            self.commits += 1;
        } else if sql.contains("ROLLBACK") {
            if let Some(snapshot) = self.snapshot.take() {
                self.tables = snapshot;
            }
            self.rollbacks += 1;
        } else if let Some(target) = target_after(sql, "CREATE TABLE ") {
            if self.tables.contains_key(target) {
                return Err(protocol_error(format!(
                    "There is already an object named '{}' in the database",
                    target
                )));
            }
            self.tables.insert(
                target.to_string(),
                FakeTable {
                    ddl: sql.to_string(),
                    rows: Vec::new(),
                },
            );
        } else if let Some(target) = target_after(sql, "DROP TABLE ") {
            if self.tables.remove(target).is_none() {
                return Err(protocol_error(format!(
                    "Cannot drop the table '{}', because it does not exist",
                    target
                )));
            }
        } else {
            return Err(protocol_error(format!("unsupported batch: {}", sql)));
        }
        Ok(())
    }
}
