//! SQL Gateway Library
//!
//! This library provides MCP (Model Context Protocol) tools that let AI agents
//! run guarded, read-only SELECT queries against SQL Server and discover the
//! exposed schema without holding database credentials.

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use mcp::GatewayService;
