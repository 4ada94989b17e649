//! SQL statement validation for read-only enforcement.
//!
//! This module provides the first gate of the `query` tool: a caller's SQL
//! must be a single SELECT statement free of data-modifying or
//! server-control keywords, statement separators and comments.
//!
//! The checks are lexical (regex on the raw text), not a parse. Known limits:
//! - a banned keyword inside a string literal or quoted identifier is still
//!   rejected (false positive, never a bypass)
//! - CTEs (`WITH ... SELECT`) are rejected because the text must start with SELECT
//! - subqueries are allowed as long as they contain no banned token

use crate::error::{GatewayError, GatewayResult};
use regex::Regex;
use std::sync::OnceLock;

/// Keywords that may not appear anywhere in a query, as whole words.
pub const BANNED_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "MERGE",
    "DROP",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "EXEC",
    "EXECUTE",
    "GRANT",
    "REVOKE",
    "DENY",
    "BACKUP",
    "RESTORE",
    "SHUTDOWN",
    "DBCC",
    "KILL",
    "RECONFIGURE",
    "WAITFOR",
    "OPENROWSET",
    "OPENDATASOURCE",
    "OPENQUERY",
    "BULK",
    "INTO",
];

/// Character sequences that may not appear anywhere in a query.
pub const BANNED_MARKERS: &[&str] = &[";", "--", "/*", "*/"];

fn leading_select() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^select\b").expect("valid select regex"))
}

fn banned_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(?:{})\b", BANNED_KEYWORDS.join("|")))
            .expect("valid banned keyword regex")
    })
}

/// Validate SQL for read-only execution in the query tool.
///
/// Returns the trimmed statement, or `GatewayError::Validation` naming the
/// offending token.
///
/// # Examples
///
/// ```
/// use sql_gateway::tools::sql_validator::validate_select;
///
/// // SELECT is allowed
/// assert!(validate_select("  select * from SalesLT.Customer ").is_ok());
///
/// // Statement stacking is blocked
/// assert!(validate_select("SELECT 1; DROP TABLE X").is_err());
/// ```
pub fn validate_select(sql: &str) -> GatewayResult<&str> {
    let trimmed = sql.trim();

    if trimmed.is_empty() {
        return Err(GatewayError::validation("Empty SQL statement"));
    }

    if !leading_select().is_match(trimmed) {
        let first_word: String = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .chars()
            .take(32)
            .collect();
        return Err(GatewayError::validation(format!(
            "Only SELECT statements are allowed; statement starts with '{}'",
            first_word
        )));
    }

    if let Some(marker) = BANNED_MARKERS.iter().find(|m| trimmed.contains(**m)) {
        return Err(GatewayError::validation(format!(
            "Statement contains banned token '{}' (separators and comments are not allowed)",
            marker
        )));
    }

    if let Some(found) = banned_keyword().find(trimmed) {
        return Err(GatewayError::validation(format!(
            "Statement contains banned keyword '{}'",
            found.as_str().to_uppercase()
        )));
    }

    Ok(trimmed)
}
