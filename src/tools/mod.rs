//! MCP tool implementations.
//!
//! This module contains the tool handlers and the query safety pipeline:
//! - `query`: Execute a guarded SELECT query
//! - `schema`: `describe_schema` and `list_relations`
//! - `sql_validator`: Read-only statement validation
//! - `limit`: Row-limit (`TOP`) injection

pub mod limit;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{
    DescribeSchemaOutput, ListRelationsOutput, SchemaScopeInput, SchemaToolHandler,
};
