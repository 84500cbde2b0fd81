//! Existence policy and table existence checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::table::TableRef;
use crate::core::traits::LoadConnection;
use crate::core::value::SqlParam;
use crate::error::{LoadError, Result};

const PERMANENT_EXISTS_QUERY: &str = "SELECT CASE WHEN EXISTS (\
     SELECT 1 FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2) THEN 1 ELSE 0 END";

const TEMP_EXISTS_QUERY: &str = "SELECT CASE WHEN OBJECT_ID(N'tempdb..' + QUOTENAME(@P1)) \
     IS NOT NULL THEN 1 ELSE 0 END";

/// What to do when the destination table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IfExists {
    /// Insert into the existing table.
    #[default]
    Append,
    /// Refuse to touch the existing table.
    Fail,
    /// Drop and recreate the table.
    Replace,
}

impl IfExists {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfExists::Append => "append",
            IfExists::Fail => "fail",
            IfExists::Replace => "replace",
        }
    }
}

impl FromStr for IfExists {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "append" => Ok(IfExists::Append),
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            other => Err(LoadError::InvalidPolicy {
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for IfExists {
    type Error = LoadError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IfExists> for String {
    fn from(value: IfExists) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The table-level action a load performs before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    /// Table is absent and will be created.
    Create,
    /// Table exists and will be dropped, then created.
    DropAndCreate,
    /// Table exists and rows are appended.
    InsertOnly,
}

/// Decide the table action from the existence check and the policy.
///
/// The policy only matters when the table exists; an absent table is always
/// created.
pub fn apply_policy(table: &TableRef, exists: bool, policy: IfExists) -> Result<TableAction> {
    if !exists {
        return Ok(TableAction::Create);
    }
    match policy {
        IfExists::Append => Ok(TableAction::InsertOnly),
        IfExists::Replace => Ok(TableAction::DropAndCreate),
        IfExists::Fail => Err(LoadError::TableExists {
            table: table.quoted(),
            temporary: table.temporary,
        }),
    }
}

/// Check whether the destination table exists on this connection.
///
/// Permanent tables are looked up in `INFORMATION_SCHEMA.TABLES`; temporary
/// tables in `tempdb`, which only sees `#` tables of the current session.
pub async fn table_exists<C>(conn: &mut C, table: &TableRef) -> Result<bool>
where
    C: LoadConnection + ?Sized,
{
    let exists = if table.temporary {
        conn.query_flag(TEMP_EXISTS_QUERY, &[SqlParam::Text(table.temp_name())])
            .await?
    } else {
        conn.query_flag(
            PERMANENT_EXISTS_QUERY,
            &[
                SqlParam::Text(table.schema.clone()),
                SqlParam::Text(table.table.clone()),
            ],
        )
        .await?
    };
    debug!("Table {} exists: {}", table, exists);
    Ok(exists)
}
