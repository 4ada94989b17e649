//! Query execution engine.
//!
//! This module hands a finished statement to the [`SqlBackend`] and reshapes
//! the raw row set into a [`QueryResult`]:
//! - Row limits (enforced by the backend's read loop and again here)
//! - Column de-duplication (first occurrence wins)
//! - Elapsed time measurement
//!
//! Failures are never retried.

use crate::db::backend::{RowSet, SqlBackend, Statement};
use crate::error::GatewayResult;
use crate::models::QueryResult;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
pub struct QueryExecutor {
    log_sql_max_len: usize,
}

impl QueryExecutor {
    pub fn new(log_sql_max_len: usize) -> Self {
        Self { log_sql_max_len }
    }

    /// Execute a statement and reshape its rows, capped at `row_limit`.
    pub async fn execute(
        &self,
        backend: &dyn SqlBackend,
        statement: Statement,
        row_limit: u32,
    ) -> GatewayResult<QueryResult> {
        let start = Instant::now();
        let statement = statement.with_max_rows(row_limit as usize);

        debug!(
            sql = %truncate_sql(&statement.sql, self.log_sql_max_len),
            params = statement.bindings.len(),
            limit = row_limit,
            backend = backend.name(),
            "Executing query"
        );

        let rows = backend.execute(&statement).await?;
        Ok(process_rows(rows, statement.sql, row_limit, start))
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LOG_SQL_MAX_LEN)
    }
}

/// Process a backend row set into a QueryResult.
fn process_rows(rows: RowSet, executed_sql: String, row_limit: u32, start: Instant) -> QueryResult {
    let RowSet { columns: raw_columns, rows: raw_rows } = rows;

    // Keep the first position of each column name
    let mut seen = HashSet::new();
    let keep: Vec<(usize, String)> = raw_columns
        .into_iter()
        .enumerate()
        .filter(|(_, name)| seen.insert(name.clone()))
        .collect();
    let columns: Vec<String> = keep.iter().map(|(_, name)| name.clone()).collect();

    let limit = row_limit as usize;
    let json_rows: Vec<serde_json::Map<String, JsonValue>> = raw_rows
        .into_iter()
        .take(limit)
        .map(|mut values| {
            keep.iter()
                .map(|(idx, name)| {
                    let value = values
                        .get_mut(*idx)
                        .map(JsonValue::take)
                        .unwrap_or(JsonValue::Null);
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    let row_count = json_rows.len();
    let truncated = row_count >= limit;
    if truncated {
        warn!(limit = row_limit, "Query result reached the row limit");
    }

    QueryResult {
        columns,
        rows: json_rows,
        row_count,
        executed_sql,
        elapsed_ms: start.elapsed().as_millis() as u64,
        truncated,
    }
}

/// Shorten SQL for log output, on a character boundary.
pub fn truncate_sql(sql: &str, max_len: usize) -> String {
    match sql.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}
