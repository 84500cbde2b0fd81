//! The connection seam between the loader and the database driver.
//!
//! The loader never opens, pools or closes connections. It borrows anything
//! implementing [`LoadConnection`] for the length of one call and issues its
//! statements strictly in sequence. The tiberius implementation lives in
//! `target::mssql`; tests use an in-memory fake.

use async_trait::async_trait;

use crate::error::Result;

use super::value::SqlParam;

/// An open, transactable SQL Server connection.
///
/// Every method must fully drain the result stream of the statement it runs
/// before returning, on success and on error, so that the next statement can
/// be issued on the same connection.
#[async_trait]
pub trait LoadConnection: Send {
    /// Run a parameterless query and return the first column of the first
    /// row as text, if any.
    async fn query_text(&mut self, sql: &str) -> Result<Option<String>>;

    /// Run a query that yields a single integer flag (0 or 1).
    async fn query_flag(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool>;

    /// Execute a parameterized statement, returning the affected row count.
    async fn execute_statement(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    /// Execute a parameterless batch (DDL, transaction control).
    async fn execute_batch(&mut self, sql: &str) -> Result<()>;

    /// Open an explicit transaction.
    async fn begin(&mut self) -> Result<()> {
        self.execute_batch("BEGIN TRANSACTION").await
    }

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()> {
        self.execute_batch("COMMIT TRANSACTION").await
    }

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()> {
        self.execute_batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }
}
