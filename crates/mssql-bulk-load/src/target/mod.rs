//! Destination table handling: name resolution, existence policy, DDL and
//! the SQL Server driver.

pub mod ddl;
pub mod mssql;
pub mod policy;
pub mod table;

pub use ddl::{generate_create, generate_drop};
pub use mssql::{HealthCheckResult, MssqlPool, TiberiusConnectionManager};
pub use policy::{apply_policy, table_exists, IfExists, TableAction};
pub use table::{split_qualified, SchemaResolver, TableRef};
