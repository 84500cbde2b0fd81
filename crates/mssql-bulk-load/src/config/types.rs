//! Configuration type definitions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::target::IfExists;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Destination database (SQL Server).
    pub target: TargetConfig,

    /// Load behavior defaults.
    #[serde(default)]
    pub load: LoadConfig,
}

/// Destination database (SQL Server) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never written back out.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Encrypt the connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust the server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Load behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// What to do when the destination table exists (default: append).
    #[serde(default)]
    pub if_exists: IfExists,

    /// Rows per chunk; each chunk is committed separately (default: 1000).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Load into a connection-scoped `#` table (default: false).
    #[serde(default)]
    pub temporary: bool,

    /// Column type overrides keyed by original column name.
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            if_exists: IfExists::default(),
            chunk_size: default_chunk_size(),
            temporary: false,
            custom: HashMap::new(),
        }
    }
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    4
}

fn default_chunk_size() -> usize {
    1000
}
