//! SQL Gateway - Main entry point.
//!
//! This server exposes a read-only SQL Server database to AI assistants as
//! MCP tools (`query`, `describe_schema`, `list_relations`).

use clap::Parser;
use sql_gateway::auth::BearerAuth;
use sql_gateway::config::{Config, TransportMode};
use sql_gateway::db::{MssqlBackend, SqlBackend, TdsConnector};
use sql_gateway::discovery::Descriptions;
use sql_gateway::mcp::GatewayService;
use sql_gateway::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        eprintln!();
        eprintln!("Usage: sql-gateway --connection-string <ADO connection string> [OPTIONS]");
        eprintln!();
        eprintln!("Examples:");
        eprintln!(
            "  sql-gateway --connection-string \"Server=tcp:localhost,1433;Database=AdventureWorks;User Id=reader;Password=...\""
        );
        eprintln!("  SQL_GATEWAY_VIEW_PATTERN='vw%' SQL_GATEWAY_TABLE_ALLOW_LIST='SalesLT.*' sql-gateway");
        std::process::exit(1);
    }

    info!(
        transport = %config.transport,
        "Starting SQL Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(?config, "Configuration loaded");

    let connection_string = config.connection_string.as_deref().unwrap_or_default();
    let connector = TdsConnector::from_connection_string(connection_string)?;
    info!(server = %connector.address(), "Database connection configured (connects on first use)");
    let backend: Arc<dyn SqlBackend> = Arc::new(MssqlBackend::new(connector, config.pool_options()));

    let descriptions = match &config.descriptions_file {
        Some(path) => Descriptions::load(path)?,
        None => Descriptions::empty(),
    };

    let service = GatewayService::new(backend, &config, descriptions);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(service).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let auth = BearerAuth::from_tokens(&config.auth_tokens)?;
            HttpTransport::new(
                service,
                auth,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
