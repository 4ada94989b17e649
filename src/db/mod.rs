//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The `SqlBackend` execution seam and its SQL Server implementation
//! - Shared lazy connection handle
//! - Named-parameter translation
//! - Query execution
//! - Schema introspection
//! - Value decoding

pub mod backend;
pub mod executor;
pub mod mssql;
pub mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use backend::{Record, RowSet, SqlBackend, Statement};
pub use executor::QueryExecutor;
pub use mssql::{MssqlBackend, PoolOptions, TdsConnector};
pub use params::{Binding, WireValue};
pub use pool::LazyHandle;
pub use schema::SchemaInspector;
