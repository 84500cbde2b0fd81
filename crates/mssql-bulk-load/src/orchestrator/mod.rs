//! Load orchestration: one dataset into one table over one connection.
//!
//! [`load_table`] walks the dataset through sanitizing, type inference,
//! schema resolution, the existence policy, DDL and the insert. All input
//! validation happens before the first statement reaches the connection.

pub mod chunked;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::identifier::check_column_names;
use crate::core::traits::LoadConnection;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::target::{
    apply_policy, generate_create, generate_drop, table_exists, IfExists, SchemaResolver,
    TableAction,
};
use crate::transfer::insert_rows;
use crate::typemap::infer_types;

pub use chunked::{full_load, load_chunked, Chunk, ChunkAction, ChunkPlan, ChunkedLoadResult};

/// Per-call loader options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Behavior when the destination table exists.
    pub if_exists: IfExists,
    /// Column type overrides keyed by original column name.
    pub custom: HashMap<String, String>,
    /// Load into a connection-scoped `#` table.
    pub temporary: bool,
}

impl LoadOptions {
    pub fn new(if_exists: IfExists) -> Self {
        Self {
            if_exists,
            ..Default::default()
        }
    }

    pub fn with_custom(mut self, column: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.custom.insert(column.into(), sql_type.into());
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }
}

/// Result of a single load call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// Rendered destination table.
    pub table: String,

    /// What was done to the table before inserting.
    pub action: TableAction,

    /// CREATE TABLE text executed, empty when the table was reused.
    pub ddl: String,

    /// Rows written.
    pub rows_inserted: u64,
}

impl LoadOutcome {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Progress of one load call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Start,
    Sanitized,
    TypesInferred,
    SchemaResolved,
    ExistenceChecked,
    Rejected,
    Acted,
    Inserted,
    Done,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Start => "start",
            LoadState::Sanitized => "sanitized",
            LoadState::TypesInferred => "types_inferred",
            LoadState::SchemaResolved => "schema_resolved",
            LoadState::ExistenceChecked => "existence_checked",
            LoadState::Rejected => "rejected",
            LoadState::Acted => "acted",
            LoadState::Inserted => "inserted",
            LoadState::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(table: &str, state: LoadState) {
    debug!("{}: {}", table, state);
}

/// Load `dataset` into `table` (`name` or `schema.name`).
///
/// The connection is borrowed for the duration of the call and is never
/// committed, opened or closed here.
pub async fn load_table<C>(
    conn: &mut C,
    dataset: &Dataset,
    table: &str,
    options: &LoadOptions,
) -> Result<LoadOutcome>
where
    C: LoadConnection + ?Sized,
{
    enter(table, LoadState::Start);

    check_column_names(&dataset.column_names())?;
    enter(table, LoadState::Sanitized);

    let specs = infer_types(dataset.columns(), &options.custom)?;
    enter(table, LoadState::TypesInferred);

    let mut resolver = SchemaResolver::new();
    let target = resolver.resolve(table, options.temporary, conn).await?;
    let table = target.quoted();
    enter(&table, LoadState::SchemaResolved);

    let exists = table_exists(conn, &target).await?;
    enter(&table, LoadState::ExistenceChecked);

    let action = match apply_policy(&target, exists, options.if_exists) {
        Ok(action) => action,
        Err(e) => {
            enter(&table, LoadState::Rejected);
            return Err(e);
        }
    };

    let ddl = match action {
        TableAction::InsertOnly => String::new(),
        TableAction::Create | TableAction::DropAndCreate => {
            if action == TableAction::DropAndCreate {
                debug!("Dropping table: {}", table);
                conn.execute_batch(&generate_drop(&target)).await?;
            }
            let ddl = generate_create(&target, &specs);
            debug!("Creating table: {}", table);
            conn.execute_batch(&ddl).await?;
            ddl
        }
    };
    enter(&table, LoadState::Acted);

    let rows_inserted = insert_rows(conn, &target, &specs, dataset).await?;
    enter(&table, LoadState::Inserted);

    info!("{}: {} rows loaded ({:?})", table, rows_inserted, action);
    enter(&table, LoadState::Done);

    Ok(LoadOutcome {
        table,
        action,
        ddl,
        rows_inserted,
    })
}
