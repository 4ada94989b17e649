//! SQL Server / Azure SQL backend over TDS.
//!
//! Connections come from a `bb8` pool built on first use. Statements without
//! bindings are sent as-is; statements with bindings go through
//! `sp_executesql` so the caller's `@name` markers are declared and bound
//! server-side.

use crate::db::backend::{RowSet, SqlBackend, Statement};
use crate::db::params::{Binding, WireValue, declaration_list};
use crate::db::pool::LazyHandle;
use crate::db::types::column_to_json;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::time::Duration;
use tiberius::{Client, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

pub type TdsClient = Client<Compat<TcpStream>>;

/// Pool sizing for the SQL Server backend.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

// =============================================================================
// Connection Manager
// =============================================================================

/// `bb8` connection manager producing TDS clients.
#[derive(Clone)]
pub struct TdsConnector {
    config: tiberius::Config,
}

impl TdsConnector {
    /// Parse an ADO.NET-style connection string.
    pub fn from_connection_string(connection_string: &str) -> GatewayResult<Self> {
        let config = tiberius::Config::from_ado_string(connection_string).map_err(|e| {
            GatewayError::configuration(format!("Invalid connection string: {}", e))
        })?;
        Ok(Self { config })
    }

    pub fn address(&self) -> String {
        self.config.get_addr()
    }

    async fn open(&self) -> Result<TdsClient, tiberius::error::Error> {
        let tcp = TcpStream::connect(self.config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        match Client::connect(self.config.clone(), tcp.compat_write()).await {
            Ok(client) => Ok(client),
            // Azure SQL gateway redirect
            Err(tiberius::error::Error::Routing { host, port }) => {
                debug!(host = %host, port = port, "Following server redirect");
                let mut config = self.config.clone();
                config.host(&host);
                config.port(port);
                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                Client::connect(config, tcp.compat_write()).await
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for TdsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Config holds credentials
        f.debug_struct("TdsConnector")
            .field("address", &self.address())
            .finish()
    }
}

#[async_trait]
impl bb8::ManageConnection for TdsConnector {
    type Connection = TdsClient;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.open().await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

// =============================================================================
// Backend
// =============================================================================

pub struct MssqlBackend {
    connector: TdsConnector,
    options: PoolOptions,
    pool: LazyHandle<bb8::Pool<TdsConnector>>,
}

impl MssqlBackend {
    pub fn new(connector: TdsConnector, options: PoolOptions) -> Self {
        Self {
            connector,
            options,
            pool: LazyHandle::new("SQL Server pool"),
        }
    }

    async fn pool(&self) -> GatewayResult<&bb8::Pool<TdsConnector>> {
        self.pool
            .get(|| async {
                info!(
                    address = %self.connector.address(),
                    max_connections = self.options.max_connections,
                    "Opening SQL Server connection pool"
                );
                let pool = bb8::Pool::builder()
                    .max_size(self.options.max_connections)
                    .connection_timeout(self.options.connect_timeout)
                    .build(self.connector.clone())
                    .await
                    .map_err(|e| {
                        GatewayError::connection(
                            format!("Failed to connect to {}: {}", self.connector.address(), e),
                            connection_suggestion(&e),
                        )
                    })?;
                Ok(pool)
            })
            .await
    }
}

#[async_trait]
impl SqlBackend for MssqlBackend {
    async fn execute(&self, statement: &Statement) -> GatewayResult<RowSet> {
        let pool = self.pool().await?;
        let mut conn = pool.get().await?;

        let query = build_query(statement);
        let mut stream = query.query(&mut *conn).await?;

        let columns: Vec<String> = stream
            .columns()
            .await?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let max_rows = statement.max_rows.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        let mut row_stream = stream.into_row_stream();
        while rows.len() < max_rows {
            match row_stream.try_next().await? {
                Some(row) => rows.push(row.into_iter().map(|v| column_to_json(&v)).collect()),
                None => break,
            }
        }

        Ok(RowSet::new(columns, rows))
    }

    fn name(&self) -> &'static str {
        "mssql"
    }

    /// Reject further queries. Pooled connections close when the backend is dropped.
    fn close(&self) {
        self.pool.close();
    }
}

/// Text of the TDS-level batch for a statement.
///
/// With bindings the caller's SQL travels as `@P1`, the declaration list as
/// `@P2`, and each value as `@P3..`, mapped onto its `@name`.
pub(crate) fn batch_text(statement: &Statement) -> String {
    if statement.bindings.is_empty() {
        return statement.sql.clone();
    }
    let mut text = String::from("EXEC sp_executesql @P1, @P2");
    for (i, binding) in statement.bindings.iter().enumerate() {
        text.push_str(&format!(", @{} = @P{}", binding.name, i + 3));
    }
    text
}

fn build_query(statement: &Statement) -> Query<'static> {
    let mut query = Query::new(batch_text(statement));
    if statement.bindings.is_empty() {
        return query;
    }
    query.bind(statement.sql.clone());
    query.bind(declaration_list(&statement.bindings));
    for Binding { value, .. } in &statement.bindings {
        match value {
            WireValue::Int(v) => query.bind(*v),
            WireValue::Float(v) => query.bind(*v),
            WireValue::Timestamp(v) => query.bind(v.naive_utc()),
            WireValue::Bit(v) => query.bind(*v),
            WireValue::Text(v) => query.bind(v.clone()),
        }
    }
    query
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &tiberius::error::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that SQL Server is running and the host/port are reachable".to_string();
    }
    if error_str.contains("login failed") {
        return "Verify the User Id and Password in the connection string".to_string();
    }
    if error_str.contains("cannot open database") {
        return "Check that the Database named in the connection string exists".to_string();
    }
    if error_str.contains("tls") || error_str.contains("certificate") {
        return "Check Encrypt / TrustServerCertificate in the connection string".to_string();
    }
    "Verify the connection string format: server=tcp:host,1433;database=db;user id=..;password=..".to_string()
}
