//! Audit records for tool calls.
//!
//! Every query and schema call emits exactly one event on the `audit` target
//! with a request id, truncated SQL, parameter count (never values), elapsed
//! time and outcome. Failures carry the error kind and server error number,
//! never the driver message.

use crate::db::executor::truncate_sql;
use crate::error::GatewayError;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// In-flight audit context for one tool call.
#[derive(Debug)]
pub struct AuditScope {
    pub request_id: String,
    tool: &'static str,
    started: Instant,
    /// Bound parameter count (query tool)
    params: Option<usize>,
    /// Caller-supplied allow-list entries (schema tools)
    requested_tables: Option<usize>,
}

impl AuditScope {
    fn begin(tool: &'static str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tool,
            started: Instant::now(),
            params: None,
            requested_tables: None,
        }
    }

    /// Start auditing a `query` call carrying `params` parameters.
    pub fn query(params: usize) -> Self {
        Self {
            params: Some(params),
            ..Self::begin("query")
        }
    }

    /// Start auditing a schema tool call scoped by `requested_tables` entries.
    pub fn schema(tool: &'static str, requested_tables: usize) -> Self {
        Self {
            requested_tables: Some(requested_tables),
            ..Self::begin(tool)
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Record a successful call.
    pub fn success(&self, sql: Option<&str>, rows: usize, log_sql_max_len: usize) {
        info!(
            target: "audit",
            request_id = %self.request_id,
            tool = self.tool,
            sql = %sql.map(|s| truncate_sql(s, log_sql_max_len)).unwrap_or_default(),
            params = self.params,
            requested_tables = self.requested_tables,
            row_count = rows,
            elapsed_ms = self.elapsed_ms(),
            outcome = "ok",
            "Tool call completed"
        );
    }

    /// Record a failed call.
    pub fn failure(&self, sql: Option<&str>, error: &GatewayError, log_sql_max_len: usize) {
        warn!(
            target: "audit",
            request_id = %self.request_id,
            tool = self.tool,
            sql = %sql.map(|s| truncate_sql(s, log_sql_max_len)).unwrap_or_default(),
            params = self.params,
            requested_tables = self.requested_tables,
            elapsed_ms = self.elapsed_ms(),
            outcome = "error",
            error_kind = error.kind(),
            error_code = error.server_code(),
            error = %error.log_detail(),
            "Tool call failed"
        );
    }
}
