//! Configuration handling for the SQL gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::PoolOptions;
use crate::discovery::ResolverPolicy;
use crate::error::{GatewayError, GatewayResult};
use crate::models::query::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT};
use crate::models::{RelationKind, RowLimits};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_LOG_SQL_MAX_LEN: usize = 200;

/// Schemas never offered by the catalog fallback.
pub const DEFAULT_EXCLUDED_SCHEMAS: &str = "sys,INFORMATION_SCHEMA,guest,db_owner,db_accessadmin,\
db_securityadmin,db_ddladmin,db_backupoperator,db_datareader,db_datawriter,db_denydatareader,\
db_denydatawriter";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the SQL gateway.
#[derive(Clone, Parser)]
#[command(
    name = "sql-gateway",
    about = "Read-only SQL Server gateway exposed as MCP tools",
    version,
    author
)]
pub struct Config {
    /// ADO.NET-style connection string, e.g.
    /// "Server=tcp:host,1433;Database=db;User Id=reader;Password=...".
    /// Sensitive: never logged.
    #[arg(long, value_name = "ADO", env = "SQL_GATEWAY_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "SQL_GATEWAY_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "SQL_GATEWAY_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "SQL_GATEWAY_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "SQL_GATEWAY_MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Authentication tokens for HTTP transport.
    /// When set, all HTTP requests must include a valid Bearer token.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "SQL_GATEWAY_AUTH_TOKENS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub auth_tokens: Vec<String>,

    /// SQL LIKE pattern selecting exposed views, e.g. "vw%"
    #[arg(long, value_name = "PATTERN", env = "SQL_GATEWAY_VIEW_PATTERN")]
    pub view_pattern: Option<String>,

    /// Tables exposed by schema tools, as "schema.name" or "schema.*"
    #[arg(
        long = "table",
        value_name = "SCHEMA.NAME",
        env = "SQL_GATEWAY_TABLE_ALLOW_LIST",
        value_delimiter = ','
    )]
    pub table_allow_list: Vec<String>,

    /// Row limit applied when a query omits rowLimit
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT, env = "SQL_GATEWAY_DEFAULT_ROW_LIMIT")]
    pub default_row_limit: u32,

    /// Upper bound for rowLimit (capped at 5000)
    #[arg(long, default_value_t = MAX_ROW_LIMIT, env = "SQL_GATEWAY_MAX_ROW_LIMIT")]
    pub max_row_limit: u32,

    /// Schemas hidden from the catalog fallback
    #[arg(
        long = "exclude-schema",
        value_name = "SCHEMA",
        env = "SQL_GATEWAY_EXCLUDED_SCHEMAS",
        value_delimiter = ',',
        default_value = DEFAULT_EXCLUDED_SCHEMAS
    )]
    pub excluded_schemas: Vec<String>,

    /// Relation kinds offered by the catalog fallback
    #[arg(
        long = "include-kind",
        value_parser = parse_relation_kind,
        env = "SQL_GATEWAY_INCLUDED_KINDS",
        value_delimiter = ',',
        default_value = "table,view"
    )]
    pub included_kinds: Vec<RelationKind>,

    /// JSON file with table and column descriptions
    #[arg(long, value_name = "FILE", env = "SQL_GATEWAY_DESCRIPTIONS_FILE")]
    pub descriptions_file: Option<PathBuf>,

    /// Maximum SQL characters written to logs
    #[arg(long, default_value_t = DEFAULT_LOG_SQL_MAX_LEN, env = "SQL_GATEWAY_LOG_SQL_MAX_LEN")]
    pub log_sql_max_len: usize,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "SQL_GATEWAY_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "SQL_GATEWAY_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SQL_GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SQL_GATEWAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            connection_string: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            auth_tokens: Vec::new(),
            view_pattern: None,
            table_allow_list: Vec::new(),
            default_row_limit: DEFAULT_ROW_LIMIT,
            max_row_limit: MAX_ROW_LIMIT,
            excluded_schemas: DEFAULT_EXCLUDED_SCHEMAS
                .split(',')
                .map(String::from)
                .collect(),
            included_kinds: vec![RelationKind::Table, RelationKind::View],
            descriptions_file: None,
            log_sql_max_len: DEFAULT_LOG_SQL_MAX_LEN,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Reject settings that cannot work together.
    pub fn validate(&self) -> GatewayResult<()> {
        match self.connection_string.as_deref() {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(GatewayError::configuration(
                    "connection string is required (--connection-string or SQL_GATEWAY_CONNECTION_STRING)",
                ));
            }
        }
        if self.max_row_limit == 0 || self.max_row_limit > MAX_ROW_LIMIT {
            return Err(GatewayError::configuration(format!(
                "max_row_limit must be between 1 and {}",
                MAX_ROW_LIMIT
            )));
        }
        if self.default_row_limit == 0 || self.default_row_limit > self.max_row_limit {
            return Err(GatewayError::configuration(format!(
                "default_row_limit ({}) must be between 1 and max_row_limit ({})",
                self.default_row_limit, self.max_row_limit
            )));
        }
        if self.max_connections == 0 {
            return Err(GatewayError::configuration(
                "max_connections must be greater than 0",
            ));
        }
        if self.included_kinds.is_empty() {
            return Err(GatewayError::configuration(
                "at least one included kind (table, view) is required",
            ));
        }
        if self.transport == TransportMode::Http && !self.mcp_endpoint.starts_with('/') {
            return Err(GatewayError::configuration(format!(
                "mcp_endpoint must start with '/': {}",
                self.mcp_endpoint
            )));
        }
        Ok(())
    }

    /// Resolution settings for schema tools.
    pub fn policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            view_pattern: self
                .view_pattern
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            allow_list: trimmed(&self.table_allow_list),
            excluded_schemas: trimmed(&self.excluded_schemas),
            included_kinds: self.included_kinds.clone(),
        }
    }

    /// Row limits for the query tool.
    pub fn limits(&self) -> RowLimits {
        RowLimits::new(self.default_row_limit, self.max_row_limit)
    }

    /// Connection pool settings.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            connect_timeout: self.connect_timeout_duration(),
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

fn parse_relation_kind(value: &str) -> Result<RelationKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "table" => Ok(RelationKind::Table),
        "view" => Ok(RelationKind::View),
        other => Err(format!("unknown relation kind '{}' (expected table or view)", other)),
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("transport", &self.transport)
            .field("http_bind_addr", &self.http_bind_addr())
            .field("mcp_endpoint", &self.mcp_endpoint)
            .field("auth_tokens", &self.auth_tokens.len())
            .field("view_pattern", &self.view_pattern)
            .field("table_allow_list", &self.table_allow_list)
            .field("default_row_limit", &self.default_row_limit)
            .field("max_row_limit", &self.max_row_limit)
            .field("included_kinds", &self.included_kinds)
            .field("descriptions_file", &self.descriptions_file)
            .finish_non_exhaustive()
    }
}
