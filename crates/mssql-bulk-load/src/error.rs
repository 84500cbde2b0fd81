//! Error types for the bulk loader.

use thiserror::Error;

/// Main error type for load operations.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two or more columns collapse to the same SQL Server identifier.
    #[error(
        "There are duplicate column names: {columns:?}. \
         SQL Server requires unique column names (case insensitive)."
    )]
    DuplicateColumns { columns: Vec<String> },

    /// A type override names a column that is not in the dataset, or two
    /// overrides name the same column.
    #[error("Custom column(s) {columns:?} not found in the dataset or given more than once")]
    CustomColumn { columns: Vec<String> },

    /// Destination table already exists and the policy is `fail`.
    #[error("{}", table_exists_message(.table, .temporary))]
    TableExists { table: String, temporary: bool },

    /// Unrecognized `if_exists` policy value.
    #[error("Incorrect value {value:?} for 'if_exists'. Can be 'append', 'fail', or 'replace'")]
    InvalidPolicy { value: String },

    /// Identifier is empty, too long or contains a null byte.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Duration column reached the loader without being converted to seconds.
    #[error("Column {column:?} holds raw durations; convert it to numeric seconds before loading")]
    UnconvertedDuration { column: String },

    /// Dataset shape is inconsistent (ragged columns, empty column set, etc.)
    #[error("Invalid dataset: {0}")]
    Dataset(String),

    /// Database connection or query error, passed through untouched.
    #[error("Database error: {0}")]
    Database(#[from] tiberius::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Insert failed for a specific table
    #[error("Insert into {table} failed: {message}")]
    Insert { table: String, message: String },

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn table_exists_message(table: &str, temporary: &bool) -> String {
    if *temporary {
        format!("Temp table {} already exists in this connection", table)
    } else {
        format!("Table {} already exists", table)
    }
}

impl LoadError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        LoadError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create an Insert error
    pub fn insert(table: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Insert {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised before any statement reached the database.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            LoadError::DuplicateColumns { .. }
                | LoadError::CustomColumn { .. }
                | LoadError::InvalidPolicy { .. }
                | LoadError::InvalidIdentifier(_)
                | LoadError::UnconvertedDuration { .. }
                | LoadError::Dataset(_)
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::Config(_) | LoadError::Yaml(_) => 2,
            e if e.is_input_error() => 3,
            LoadError::Csv(_) | LoadError::Io(_) | LoadError::Json(_) => 3,
            LoadError::TableExists { .. } => 4,
            LoadError::Database(_) | LoadError::Pool { .. } | LoadError::Insert { .. } => 5,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;
