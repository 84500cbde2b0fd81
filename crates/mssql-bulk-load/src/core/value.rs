//! Bound parameter values.
//!
//! [`SqlParam`] is what actually crosses the connection boundary. NULLs carry
//! a [`SqlNullType`] hint so the driver can declare a correctly typed NULL
//! parameter instead of guessing.

use chrono::NaiveDateTime;

/// Type hint for NULL parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I64,
    F64,
    String,
    DateTime,
}

/// A single parameter bound to a prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// NULL with type hint for correct parameter declaration.
    Null(SqlNullType),

    /// Boolean value (bit).
    Bool(bool),

    /// 64-bit signed integer.
    I64(i64),

    /// 64-bit floating point. Never NaN once bound by the insert executor.
    F64(f64),

    /// Text value.
    Text(String),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}
