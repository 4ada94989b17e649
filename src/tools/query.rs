//! Query execution tool.
//!
//! This module implements the `query` MCP tool: the SQL safety pipeline
//! (validate, inject TOP, translate parameters) followed by execution.

use crate::audit::AuditScope;
use crate::db::{QueryExecutor, SqlBackend, Statement, params};
use crate::error::GatewayResult;
use crate::models::{QueryRequest, QueryResult, RowLimits};
use crate::tools::{limit, sql_validator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    /// A single T-SQL SELECT statement. No semicolons, comments or data-modifying keywords. Reference parameters as :name.
    pub sql: String,
    /// Named parameter values, e.g. {"id": 42}. Whole numbers bind as int, fractions as float, booleans as bit, RFC 3339 strings as datetime2, everything else as nvarchar. Null values are not bound.
    #[serde(default)]
    pub params: serde_json::Map<String, JsonValue>,
    /// Maximum rows to return. Default: 100, max: 5000. Out-of-range values are clamped.
    #[serde(default, alias = "row_limit")]
    pub row_limit: Option<i64>,
}

impl From<QueryInput> for QueryRequest {
    fn from(input: QueryInput) -> Self {
        Self {
            sql: input.sql,
            params: input.params,
            row_limit: input.row_limit,
        }
    }
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows as column-name to value maps
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// The statement actually sent to the database
    pub sql_used: String,
    pub elapsed_ms: u64,
    /// True if the result filled the row limit; more rows may exist
    pub truncated: bool,
    /// Adjustments made to the request (clamped limit, kept TOP clause, truncation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl QueryOutput {
    pub fn from_result(result: QueryResult, notes: Vec<String>) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows,
            row_count: result.row_count,
            sql_used: result.executed_sql,
            elapsed_ms: result.elapsed_ms,
            truncated: result.truncated,
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.join(" "))
            },
        }
    }
}

/// Statement produced by the safety pipeline, before execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub statement: Statement,
    pub row_limit: u32,
    pub notes: Vec<String>,
}

/// Run validation, TOP injection and parameter translation.
pub fn prepare(request: &QueryRequest, limits: RowLimits) -> GatewayResult<PreparedQuery> {
    let validated = sql_validator::validate_select(&request.sql)?;

    let row_limit = limits.effective(request.row_limit);
    let mut notes = Vec::new();
    if let Some(requested) = request.row_limit {
        if requested != row_limit as i64 {
            notes.push(format!(
                "Requested rowLimit {} is outside [1, {}]; using {}.",
                requested, limits.max, row_limit
            ));
        }
    }

    let limited = limit::inject_top(validated, row_limit);
    if limited.kept_existing {
        notes.push(format!(
            "Statement already has a TOP clause; it was kept and rows are capped at {}.",
            row_limit
        ));
    }

    let (sql, bindings) = params::translate(&limited.sql, &request.params)?;

    Ok(PreparedQuery {
        statement: Statement::new(sql).with_bindings(bindings),
        row_limit,
        notes,
    })
}

/// Handler for the query tool.
pub struct QueryToolHandler {
    backend: Arc<dyn SqlBackend>,
    executor: QueryExecutor,
    limits: RowLimits,
    log_sql_max_len: usize,
}

impl QueryToolHandler {
    pub fn new(backend: Arc<dyn SqlBackend>, limits: RowLimits, log_sql_max_len: usize) -> Self {
        Self {
            backend,
            executor: QueryExecutor::new(log_sql_max_len),
            limits,
            log_sql_max_len,
        }
    }

    /// Handle the query tool call.
    pub async fn query(&self, input: QueryInput) -> GatewayResult<QueryOutput> {
        let request = QueryRequest::from(input);
        let audit = AuditScope::query(request.params.len());

        match self.run(&request).await {
            Ok((output, sql)) => {
                audit.success(Some(&sql), output.row_count, self.log_sql_max_len);
                Ok(output)
            }
            Err(e) => {
                audit.failure(Some(&request.sql), &e, self.log_sql_max_len);
                Err(e)
            }
        }
    }

    async fn run(&self, request: &QueryRequest) -> GatewayResult<(QueryOutput, String)> {
        let PreparedQuery {
            statement,
            row_limit,
            mut notes,
        } = prepare(request, self.limits)?;

        let result = self
            .executor
            .execute(self.backend.as_ref(), statement, row_limit)
            .await?;

        if result.truncated {
            notes.push(format!(
                "Result reached the {}-row limit; more rows may exist. Narrow the query or raise rowLimit.",
                row_limit
            ));
        }

        let sql = result.executed_sql.clone();
        Ok((QueryOutput::from_result(result, notes), sql))
    }
}

impl std::fmt::Debug for QueryToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryToolHandler")
            .field("backend", &self.backend.name())
            .field("limits", &self.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::WireValue;
    use serde_json::json;

    #[test]
    fn test_prepare_example() {
        let request = QueryRequest::new("SELECT * FROM SalesLT.Customer WHERE CustomerID = :id")
            .with_param("id", 42)
            .with_row_limit(10);
        let prepared = prepare(&request, RowLimits::default()).unwrap();
        assert_eq!(
            prepared.statement.sql,
            "SELECT TOP(10) * FROM SalesLT.Customer WHERE CustomerID = @id"
        );
        assert_eq!(prepared.statement.bindings.len(), 1);
        assert_eq!(prepared.statement.bindings[0].value, WireValue::Int(42));
        assert_eq!(prepared.row_limit, 10);
        assert!(prepared.notes.is_empty());
    }

    #[test]
    fn test_prepare_keeps_existing_top() {
        let request = QueryRequest::new("SELECT TOP(5) * FROM vwUsers").with_row_limit(200);
        let prepared = prepare(&request, RowLimits::default()).unwrap();
        assert_eq!(prepared.statement.sql, "SELECT TOP(5) * FROM vwUsers");
        assert_eq!(prepared.notes.len(), 1);
    }

    #[test]
    fn test_prepare_clamps_limit_with_note() {
        let request = QueryRequest::new("SELECT 1").with_row_limit(50_000);
        let prepared = prepare(&request, RowLimits::default()).unwrap();
        assert_eq!(prepared.row_limit, 5000);
        assert_eq!(prepared.statement.sql, "SELECT TOP(5000) 1");
        assert!(prepared.notes[0].contains("50000"));
    }

    #[test]
    fn test_prepare_default_limit() {
        let prepared = prepare(&QueryRequest::new("SELECT 1"), RowLimits::default()).unwrap();
        assert_eq!(prepared.row_limit, 100);
    }

    #[test]
    fn test_prepare_rejects_before_binding() {
        let request = QueryRequest::new("SELECT 1; DROP TABLE X").with_param("bad name", 1);
        let err = prepare(&request, RowLimits::default()).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_prepare_binding_error() {
        let request = QueryRequest::new("SELECT :n").with_param("n", json!(9_999_999_999i64));
        assert_eq!(prepare(&request, RowLimits::default()).unwrap_err().kind(), "binding");
    }

    #[test]
    fn test_input_accepts_both_limit_spellings() {
        let a: QueryInput = serde_json::from_value(json!({"sql": "SELECT 1", "rowLimit": 5})).unwrap();
        let b: QueryInput = serde_json::from_value(json!({"sql": "SELECT 1", "row_limit": 5})).unwrap();
        assert_eq!(a.row_limit, Some(5));
        assert_eq!(b.row_limit, Some(5));
    }

    #[test]
    fn test_output_is_camel_case() {
        let result = QueryResult {
            columns: vec!["n".into()],
            rows: vec![],
            row_count: 0,
            executed_sql: "SELECT TOP(1) n FROM t".into(),
            elapsed_ms: 3,
            truncated: false,
        };
        let value = serde_json::to_value(QueryOutput::from_result(result, vec![])).unwrap();
        assert_eq!(value["sqlUsed"], "SELECT TOP(1) n FROM t");
        assert_eq!(value["rowCount"], 0);
        assert!(value.get("notes").is_none());
    }
}
