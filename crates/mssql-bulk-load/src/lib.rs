//! # mssql-bulk-load
//!
//! Bulk loader for in-memory tabular datasets into SQL Server tables.
//!
//! Given a [`Dataset`], a destination table name and an existence policy,
//! the loader:
//!
//! - sanitizes column names and rejects case-insensitive collisions
//! - infers SQL Server column types, honoring per-column overrides
//! - resolves the destination schema from the connection when not given
//! - applies the `append` / `fail` / `replace` policy, creating the table
//!   when needed (permanent or connection-scoped `#` tables)
//! - inserts every row with batched parameterized statements
//!
//! The loader borrows an open connection and never commits; callers that
//! want chunked, committed loads use [`load_chunked`] or [`full_load`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_bulk_load::{load_table, Column, Config, Dataset, MssqlPool};
//!
//! #[tokio::main]
//! async fn main() -> mssql_bulk_load::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let pool = MssqlPool::new(&config.target).await?;
//!     let mut conn = pool.get().await?;
//!
//!     let dataset = Dataset::new(vec![
//!         Column::integers("qty", [1, 2, 3]),
//!         Column::texts("item name", ["a", "b", "c"]),
//!     ])?;
//!     let outcome = load_table(&mut *conn, &dataset, "dbo.sales", &config.load.to_options()).await?;
//!     println!("Loaded {} rows into {}", outcome.rows_inserted, outcome.table);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod orchestrator;
pub mod target;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, LoadConfig, TargetConfig};
pub use crate::core::{LoadConnection, SqlNullType, SqlParam};
pub use dataset::csv::{read_csv, CsvOptions};
pub use dataset::{Column, Dataset, SemanticType, Value};
pub use error::{LoadError, Result};
pub use orchestrator::{
    full_load, load_chunked, load_table, ChunkPlan, ChunkedLoadResult, LoadOptions, LoadOutcome,
};
pub use target::{HealthCheckResult, IfExists, MssqlPool, TableAction, TableRef};
pub use typemap::{infer_types, ColumnSpec};
