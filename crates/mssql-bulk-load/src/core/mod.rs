//! Core abstractions shared by every loader stage.
//!
//! - [`identifier`]: sanitizing, validating and quoting SQL Server identifiers
//! - [`value`]: bound parameter representation with typed NULLs
//! - [`traits`]: the [`LoadConnection`] seam the loader talks to

pub mod identifier;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod fake;

pub use identifier::{
    check_column_names, check_duplicates, clean_identifier, sanitize, validate_identifier,
};
pub use traits::LoadConnection;
pub use value::{SqlNullType, SqlParam};
