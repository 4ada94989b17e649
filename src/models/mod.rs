//! Data models for the SQL gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryRequest, QueryResult, RowLimits};
pub use schema::{
    ColumnDescriptor, ForeignKeyEdge, QueryTemplate, RelationDescriptor, RelationEntry,
    RelationKind, SchemaCatalog, SchemaMode, quote_ident,
};
