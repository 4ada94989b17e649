//! Row-limit clause injection.
//!
//! Makes sure the statement sent to SQL Server carries exactly one top-level
//! `TOP` clause. Only the leading SELECT (and an optional `DISTINCT`/`ALL`
//! right after it) is examined; nested SELECTs are left alone.

use regex::Regex;
use std::sync::OnceLock;

/// `SELECT [DISTINCT|ALL]` at the start of the statement.
fn select_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^select\b(?:\s+(?:distinct|all)\b)?")
            .expect("valid select head regex")
    })
}

/// `TOP n` or `TOP (<expr>)` at the start of a remainder. The parenthesized
/// form covers literals as well as variables and placeholders (`TOP(:n)`).
fn existing_top() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s+top\s*(?:\(\s*[^)\s][^)]*\)|\d+\b)")
            .expect("valid top regex")
    })
}

/// Outcome of limit injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limited {
    pub sql: String,
    /// True when the statement already had a TOP clause and was returned unchanged.
    pub kept_existing: bool,
}

/// Ensure `sql` has a leading `TOP` clause, inserting `TOP(limit)` if absent.
///
/// `sql` is expected to have passed validation (trimmed, starts with SELECT).
/// Idempotent: feeding the output back in returns it unchanged.
pub fn inject_top(sql: &str, limit: u32) -> Limited {
    let Some(head) = select_head().find(sql) else {
        return Limited {
            sql: sql.to_string(),
            kept_existing: false,
        };
    };
    let head_end = head.end();

    if existing_top().is_match(&sql[head_end..]) {
        return Limited {
            sql: sql.to_string(),
            kept_existing: true,
        };
    }

    let mut out = String::with_capacity(sql.len() + 12);
    out.push_str(&sql[..head_end]);
    out.push_str(&format!(" TOP({})", limit));
    let rest = &sql[head_end..];
    // `SELECT*` / `SELECT(...)` still need a separator after the clause
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(rest);

    Limited {
        sql: out,
        kept_existing: false,
    }
}

/// Count `TOP` clauses directly after the leading SELECT head (0 or 1).
pub fn leading_top_count(sql: &str) -> usize {
    let Some(head) = select_head().find(sql) else {
        return 0;
    };
    let head_end = head.end();
    usize::from(existing_top().is_match(&sql[head_end..]))
}
