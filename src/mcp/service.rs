//! MCP service implementation using rmcp.
//!
//! This module defines the GatewayService struct with the gateway tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::config::Config;
use crate::db::SqlBackend;
use crate::discovery::{Descriptions, MetadataAssembler, SchemaResolver};
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler};
use crate::tools::schema::{
    DescribeSchemaOutput, ListRelationsOutput, SchemaScopeInput, SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayService {
    /// Shared database backend, closed on shutdown
    backend: Arc<dyn SqlBackend>,
    query_handler: Arc<QueryToolHandler>,
    schema_handler: Arc<SchemaToolHandler>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl GatewayService {
    /// Wire the tool handlers around one shared backend.
    ///
    /// # Arguments
    ///
    /// * `backend` - Database backend shared by every tool
    /// * `config` - Row limits, resolution policy and log settings
    /// * `descriptions` - Static table and column descriptions
    pub fn new(backend: Arc<dyn SqlBackend>, config: &Config, descriptions: Descriptions) -> Self {
        let resolver = Arc::new(SchemaResolver::new(backend.clone(), config.policy()));
        let assembler = Arc::new(MetadataAssembler::new(
            backend.clone(),
            Arc::new(descriptions),
        ));
        Self {
            query_handler: Arc::new(QueryToolHandler::new(
                backend.clone(),
                config.limits(),
                config.log_sql_max_len,
            )),
            schema_handler: Arc::new(SchemaToolHandler::new(
                resolver,
                assembler,
                config.log_sql_max_len,
            )),
            backend,
            tool_router: Self::tool_router(),
        }
    }

    /// Close the shared backend. In-flight and later tool calls fail with a connection error.
    pub fn close(&self) {
        self.backend.close();
    }
}

#[tool_router]
impl GatewayService {
    #[tool(
        description = "Run one read-only T-SQL SELECT and return rows as JSON.\nThe statement must start with SELECT and may not contain ';', comments or data-modifying keywords.\nReference parameters as :name and pass values in `params`.\nA TOP(rowLimit) clause is added unless the statement already has one.\nCall `describe_schema` first to learn table and column names."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler.query(input).await.map(Json).map_err(McpError::from)
    }

    #[tool(
        description = "Describe the tables and views this gateway exposes.\nReturns columns (type, nullability, primary key), foreign keys, sample joins and reusable query templates.\n`mode` selects views, tables or both; `tables` narrows the set to specific 'schema.name' or 'schema.*' entries."
    )]
    async fn describe_schema(
        &self,
        Parameters(input): Parameters<SchemaScopeInput>,
    ) -> Result<Json<DescribeSchemaOutput>, McpError> {
        self.schema_handler
            .describe_schema(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List the qualified names of the tables and views this gateway exposes, without column metadata.\nAccepts the same `mode` and `tables` arguments as describe_schema."
    )]
    async fn list_relations(
        &self,
        Parameters(input): Parameters<SchemaScopeInput>,
    ) -> Result<Json<ListRelationsOutput>, McpError> {
        self.schema_handler
            .list_relations(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for GatewayService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sql-gateway".to_owned(),
                title: Some("SQL Gateway".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only access to a SQL Server database.\n\
                \n\
                ## Workflow\n\
                1. Call `describe_schema` (or `list_relations` for names only) to see what is exposed\n\
                2. Write a single SELECT against those relations and call `query`\n\
                3. Pass values through `params` (`:name` in the SQL), never by string concatenation\n\
                \n\
                ## Rules\n\
                - Only SELECT statements; no `;`, `--`, `/* */` or data-modifying keywords\n\
                - Results are capped by `rowLimit` (default 100, max 5000); `truncated: true` means more rows may exist\n\
                - Use T-SQL syntax: `TOP(n)`, `[bracketed]` identifiers, `schema.name` qualification\n\
                \n\
                ## Errors\n\
                Errors carry `kind` and `suggestion` in their data. `validation` and `binding` errors\n\
                mean the request must change; `execution` errors include the SQL Server message."
                    .to_string(),
            ),
        }
    }
}
