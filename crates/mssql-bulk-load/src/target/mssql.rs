//! SQL Server connectivity: the tiberius [`LoadConnection`] implementation
//! and a bb8 connection pool for callers that do not manage their own
//! connections.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::NaiveDateTime;
use futures::{AsyncRead, AsyncWrite};
use serde::Serialize;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::traits::LoadConnection;
use crate::core::value::{SqlNullType, SqlParam};
use crate::error::{LoadError, Result};

/// Maximum TDS packet size.
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// Connection pool timeouts.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    config: TargetConfig,
}

impl TiberiusConnectionManager {
    pub fn new(config: TargetConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }
        if self.config.trust_server_cert {
            config.trust_cert();
        }

        config.packet_size(TDS_MAX_PACKET_SIZE);
        config
    }
}

fn io_error(e: std::io::Error, context: &str) -> tiberius::error::Error {
    tiberius::error::Error::Io {
        kind: e.kind(),
        message: format!("{}: {}", context, e),
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| io_error(e, "connecting to SQL Server"))?;

        tcp.set_nodelay(true).ok();

        let std_tcp = tcp
            .into_std()
            .map_err(|e| io_error(e, "detaching socket"))?;
        let socket = socket2::Socket::from(std_tcp);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on SQL Server connection: {}", e);
        }

        let std_tcp: std::net::TcpStream = socket.into();
        std_tcp.set_nonblocking(true).ok();
        let tcp = TcpStream::from_std(std_tcp).map_err(|e| io_error(e, "converting socket"))?;

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub server: String,
    pub latency_ms: u64,
    pub default_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pooled SQL Server connections.
///
/// The loader itself only borrows a connection; this pool is how the CLI
/// obtains one.
pub struct MssqlPool {
    pool: Pool<TiberiusConnectionManager>,
    server: String,
}

impl MssqlPool {
    /// Build the pool and verify one connection.
    pub async fn new(config: &TargetConfig) -> Result<Self> {
        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|e| LoadError::pool(e, "creating SQL Server pool"))?;

        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| LoadError::pool(e, "testing SQL Server connection"))?;
            conn.simple_query("SELECT 1").await?.into_results().await?;
        }

        let server = format!("{}:{}/{}", config.host, config.port, config.database);
        info!(
            "Connected to SQL Server: {} (pool_size={})",
            server, config.pool_size
        );

        Ok(Self { pool, server })
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| LoadError::pool(e, "getting SQL Server connection"))
    }

    /// Probe the server, reporting latency and the login's default schema.
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let probe: Result<Option<String>> = async {
            let mut conn = self.get().await?;
            conn.query_text("SELECT SCHEMA_NAME()").await
        }
        .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match probe {
            Ok(default_schema) => HealthCheckResult {
                healthy: true,
                server: self.server.clone(),
                latency_ms,
                default_schema,
                error: None,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                server: self.server.clone(),
                latency_ms,
                default_schema: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Convert a bound parameter into a tiberius parameter.
///
/// NULLs are declared with the type of their column.
fn sql_param_to_tosql(param: &SqlParam) -> Box<dyn ToSql> {
    match param {
        SqlParam::Null(null_type) => match null_type {
            SqlNullType::Bool => Box::new(Option::<bool>::None),
            SqlNullType::I64 => Box::new(Option::<i64>::None),
            SqlNullType::F64 => Box::new(Option::<f64>::None),
            SqlNullType::String => Box::new(Option::<String>::None),
            SqlNullType::DateTime => Box::new(Option::<NaiveDateTime>::None),
        },
        SqlParam::Bool(b) => Box::new(*b),
        SqlParam::I64(i) => Box::new(*i),
        SqlParam::F64(f) => Box::new(*f),
        SqlParam::Text(s) => Box::new(s.clone()),
        SqlParam::DateTime(dt) => Box::new(*dt),
    }
}

#[async_trait]
impl<S> LoadConnection for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn query_text(&mut self, sql: &str) -> Result<Option<String>> {
        let row = self.simple_query(sql).await?.into_row().await?;
        match row {
            Some(row) => Ok(row.try_get::<&str, _>(0)?.map(str::to_string)),
            None => Ok(None),
        }
    }

    async fn query_flag(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool> {
        let boxed: Vec<Box<dyn ToSql>> = params.iter().map(sql_param_to_tosql).collect();
        let refs: Vec<&dyn ToSql> = boxed.iter().map(|p| p.as_ref()).collect();
        let row = self.query(sql, &refs).await?.into_row().await?;
        let flag = match row {
            Some(row) => row.try_get::<i32, _>(0)?.unwrap_or(0),
            None => 0,
        };
        Ok(flag != 0)
    }

    async fn execute_statement(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let boxed: Vec<Box<dyn ToSql>> = params.iter().map(sql_param_to_tosql).collect();
        let refs: Vec<&dyn ToSql> = boxed.iter().map(|p| p.as_ref()).collect();
        let result = self.execute(sql, &refs).await?;
        Ok(result.total())
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<()> {
        debug!("Executing: {}", sql);
        self.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}
