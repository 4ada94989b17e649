//! The execution seam between the gateway and a database.
//!
//! Everything above this module (validation, rewriting, discovery) is
//! engine-agnostic text and JSON handling; the only way a statement reaches a
//! database is through [`SqlBackend::execute`].

use crate::db::params::Binding;
use crate::error::GatewayResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A statement ready for the driver: final SQL text plus typed bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<Binding>,
    /// Stop reading after this many rows.
    pub max_rows: Option<usize>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
            max_rows: None,
        }
    }

    pub fn with_bindings(mut self, bindings: Vec<Binding>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// Raw tabular result as produced by a backend.
///
/// Column names may repeat (e.g. `SELECT a.*, b.*`); values are positional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    /// Position of the first column with this name (case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Iterate rows with by-name accessors, used when reading catalog queries.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record { set: self, values })
    }
}

/// Borrowed view of one row with typed by-name accessors.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    set: &'a RowSet,
    values: &'a [JsonValue],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a JsonValue> {
        self.set
            .column_index(column)
            .and_then(|i| self.values.get(i))
            .filter(|v| !v.is_null())
    }

    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(JsonValue::as_str)
    }

    pub fn string(&self, column: &str) -> String {
        self.str(column).unwrap_or_default().to_string()
    }

    /// Read an integer, accepting numeric strings (e.g. decoded `numeric`).
    pub fn i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Read a flag stored as `bit`, integer or `YES`/`NO` text.
    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Number(n) => n.as_i64().map(|v| v != 0),
            JsonValue::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "YES" | "TRUE" | "1" => Some(true),
                "NO" | "FALSE" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// External execution collaborator.
///
/// Implementations must not retry and must surface driver failures as
/// [`GatewayError::Execution`](crate::error::GatewayError::Execution) with the
/// driver's message intact.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn execute(&self, statement: &Statement) -> GatewayResult<RowSet>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Release pooled resources. Later calls to `execute` fail with a connection error.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RowSet {
        RowSet::new(
            vec!["TABLE_SCHEMA".into(), "IS_NULLABLE".into(), "ORD".into()],
            vec![
                vec![json!("dbo"), json!("YES"), json!(1)],
                vec![json!("SalesLT"), json!("NO"), json!("2")],
                vec![JsonValue::Null, json!(true), JsonValue::Null],
            ],
        )
    }

    #[test]
    fn test_record_accessors() {
        let set = sample();
        let records: Vec<_> = set.records().collect();
        assert_eq!(records[0].str("table_schema"), Some("dbo"));
        assert_eq!(records[0].bool("IS_NULLABLE"), Some(true));
        assert_eq!(records[1].bool("IS_NULLABLE"), Some(false));
        assert_eq!(records[0].i64("ORD"), Some(1));
        assert_eq!(records[1].i64("ORD"), Some(2));
    }

    #[test]
    fn test_record_null_is_none() {
        let set = sample();
        let record = set.records().nth(2).unwrap();
        assert_eq!(record.str("TABLE_SCHEMA"), None);
        assert_eq!(record.string("TABLE_SCHEMA"), "");
        assert_eq!(record.i64("ORD"), None);
    }

    #[test]
    fn test_unknown_column() {
        let set = sample();
        assert!(set.records().next().unwrap().get("missing").is_none());
    }

    #[test]
    fn test_statement_builder() {
        let stmt = Statement::new("SELECT 1").with_max_rows(5);
        assert_eq!(stmt.max_rows, Some(5));
        assert!(stmt.bindings.is_empty());
    }
}
