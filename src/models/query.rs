//! Query-related data models.
//!
//! This module defines types for SQL query requests and results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit when the caller omits one.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Hard upper bound for any row limit, configured or requested.
pub const MAX_ROW_LIMIT: u32 = 5000;

/// Row limit bounds in effect for a server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLimits {
    pub default: u32,
    pub max: u32,
}

impl RowLimits {
    /// Create limits, clamping both values into `[1, MAX_ROW_LIMIT]` and
    /// keeping `default <= max`.
    pub fn new(default: u32, max: u32) -> Self {
        let max = max.clamp(1, MAX_ROW_LIMIT);
        Self {
            default: default.clamp(1, max),
            max,
        }
    }

    /// Resolve the limit for a request. Out-of-range requests are clamped, never rejected.
    pub fn effective(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(n) => n.clamp(1, self.max as i64) as u32,
            None => self.default,
        }
    }
}

impl Default for RowLimits {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT)
    }
}

/// One ad-hoc query as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    /// Named parameters referenced as `:name` in the SQL.
    #[serde(default)]
    pub params: serde_json::Map<String, JsonValue>,
    #[serde(default)]
    pub row_limit: Option<i64>,
}

impl QueryRequest {
    /// Create a new query request without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: serde_json::Map::new(),
            row_limit: None,
        }
    }

    /// Add a named parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the row limit.
    pub fn with_row_limit(mut self, limit: i64) -> Self {
        self.row_limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Distinct column names in result order
    pub columns: Vec<String>,
    /// Rows keyed by column name, keys in `columns` order
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// Exact statement text handed to the database
    pub executed_sql: String,
    pub elapsed_ms: u64,
    /// True when the result filled the effective limit
    pub truncated: bool,
}

impl QueryResult {
    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_limits_default() {
        let limits = RowLimits::default();
        assert_eq!(limits.effective(None), DEFAULT_ROW_LIMIT);
    }

    #[test]
    fn test_row_limits_clamp_requested() {
        let limits = RowLimits::default();
        assert_eq!(limits.effective(Some(0)), 1);
        assert_eq!(limits.effective(Some(-20)), 1);
        assert_eq!(limits.effective(Some(10)), 10);
        assert_eq!(limits.effective(Some(99_999)), MAX_ROW_LIMIT);
    }

    #[test]
    fn test_row_limits_configured_max_is_capped() {
        let limits = RowLimits::new(20_000, 50_000);
        assert_eq!(limits.max, MAX_ROW_LIMIT);
        assert_eq!(limits.default, MAX_ROW_LIMIT);
    }

    #[test]
    fn test_row_limits_default_not_above_max() {
        let limits = RowLimits::new(500, 200);
        assert_eq!(limits.default, 200);
        assert_eq!(limits.effective(Some(300)), 200);
    }

    #[test]
    fn test_query_request_builder() {
        let req = QueryRequest::new("SELECT 1")
            .with_param("id", 42)
            .with_row_limit(10);
        assert_eq!(req.params["id"], 42);
        assert_eq!(req.row_limit, Some(10));
    }
}
