//! Randomized property tests for the query safety pipeline.
//!
//! This test suite generates random, malicious, and edge-case inputs and
//! checks the invariants that must hold for every one of them: no panics,
//! banned input is always rejected, limit injection is idempotent and row
//! counts never exceed the limit.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use serde_json::{Map, Value as JsonValue, json};
use sql_gateway::db::params::{rewrite_placeholders, translate};
use sql_gateway::models::{MAX_ROW_LIMIT, QueryRequest, RowLimits};
use sql_gateway::tools::limit::{inject_top, leading_top_count};
use sql_gateway::tools::query::prepare;
use sql_gateway::tools::sql_validator::{BANNED_KEYWORDS, BANNED_MARKERS, validate_select};

const ITERATIONS: usize = 500;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random identifier that cannot collide with a banned keyword.
fn random_ident() -> String {
    format!("c_{}", random_string(rand::thread_rng().gen_range(1..12)))
}

/// Random harmless SELECT.
fn random_select() -> String {
    let mut rng = rand::thread_rng();
    let columns: Vec<String> = (0..rng.gen_range(1..5)).map(|_| random_ident()).collect();
    let head = ["SELECT", "select", "Select", "SELECT DISTINCT", "select all"]
        .choose(&mut rng)
        .copied()
        .unwrap_or("SELECT");
    let mut sql = format!("{} {} FROM dbo.{}", head, columns.join(", "), random_ident());
    if rng.gen_bool(0.5) {
        sql.push_str(&format!(" WHERE {} = :{}", columns[0], random_ident()));
    }
    sql
}

/// Randomize the case of each ASCII letter.
fn scramble_case(s: &str) -> String {
    let mut rng = rand::thread_rng();
    s.chars()
        .map(|c| {
            if rng.gen_bool(0.5) {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Generate various edge-case strings
fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "\0".to_string(),
        "🚀".repeat(100),
        "'OR 1=1--".to_string(),
        "'; DROP TABLE users--".to_string(),
        "SELECT".to_string(),
        "SELECT TOP".to_string(),
        "SELECT TOP(".to_string(),
        "SELECT 'é' AS ü".to_string(),
        "a".repeat(100_000),
        format!("SELECT {}", "x, ".repeat(10_000)),
    ]
}

#[test]
fn test_edge_cases_never_panic() {
    for input in edge_case_strings() {
        let _ = validate_select(&input);
        let _ = inject_top(&input, 10);
        let _ = rewrite_placeholders(&input);
        let _ = prepare(&QueryRequest::new(input.clone()), RowLimits::default());
    }
}

#[test]
fn test_random_select_passes_validation() {
    for _ in 0..ITERATIONS {
        let sql = random_select();
        assert!(validate_select(&sql).is_ok(), "rejected: {}", sql);
    }
}

#[test]
fn test_non_select_is_always_rejected() {
    let starts = ["WITH", "UPDATE", "SHOW", "DECLARE", "SET", "USE", "(", "VALUES"];
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let start = starts.choose(&mut rng).copied().unwrap_or("WITH");
        let padding = " ".repeat(rng.gen_range(0..4));
        let sql = format!("{}{} {}", padding, scramble_case(start), random_select());
        assert!(validate_select(&sql).is_err(), "accepted: {}", sql);
    }
}

#[test]
fn test_banned_tokens_are_always_rejected() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let base = random_select();
        let token = if rng.gen_bool(0.5) {
            scramble_case(BANNED_KEYWORDS.choose(&mut rng).copied().unwrap_or("DROP"))
        } else {
            BANNED_MARKERS.choose(&mut rng).copied().unwrap_or(";").to_string()
        };
        // Insert at a word boundary somewhere after the leading SELECT
        let spaces: Vec<usize> = base.match_indices(' ').map(|(i, _)| i).collect();
        let at = spaces.choose(&mut rng).copied().unwrap_or(base.len());
        let sql = format!("{} {} {}", &base[..at], token, &base[at..]);
        assert!(validate_select(&sql).is_err(), "accepted: {}", sql);
    }
}

#[test]
fn test_limit_injection_is_idempotent_with_one_clause() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let sql = random_select();
        let limit = rng.gen_range(1..=MAX_ROW_LIMIT);

        let once = inject_top(&sql, limit);
        assert!(!once.kept_existing);
        assert_eq!(leading_top_count(&once.sql), 1, "{}", once.sql);
        assert!(once.sql.contains(&format!("TOP({})", limit)));

        let twice = inject_top(&once.sql, rng.gen_range(1..=MAX_ROW_LIMIT));
        assert!(twice.kept_existing);
        assert_eq!(twice.sql, once.sql);
    }
}

#[test]
fn test_placeholders_become_at_markers() {
    for _ in 0..ITERATIONS {
        let names: Vec<String> = (0..3).map(|_| random_ident()).collect();
        let sql = format!(
            "SELECT * FROM t WHERE a = :{} AND b = :{} OR c = :{}",
            names[0], names[1], names[2]
        );
        let rewritten = rewrite_placeholders(&sql);
        assert!(!rewritten.contains(':'), "{}", rewritten);
        for name in &names {
            assert!(rewritten.contains(&format!("@{}", name)));
        }
    }
}

#[test]
fn test_random_params_bind_or_fail_cleanly() {
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let value: JsonValue = match rng.gen_range(0..6) {
            0 => json!(rng.gen_range(i32::MIN..=i32::MAX)),
            1 => json!(rng.gen_range(-1e9..1e9)),
            2 => json!(rng.gen_bool(0.5)),
            3 => json!(random_string(rng.gen_range(0..40))),
            4 => JsonValue::Null,
            _ => json!(rng.gen_range(i64::MIN..i64::MAX)),
        };
        let mut params = Map::new();
        params.insert("p".to_string(), value.clone());

        match translate("SELECT * FROM t WHERE x = :p", &params) {
            Ok((sql, bindings)) => {
                assert_eq!(sql, "SELECT * FROM t WHERE x = @p");
                assert_eq!(bindings.len(), usize::from(!value.is_null()));
            }
            Err(e) => {
                assert_eq!(e.kind(), "binding");
                let n = value.as_i64().expect("only out-of-range integers fail");
                assert!(i32::try_from(n).is_err());
            }
        }
    }
}

#[test]
fn test_effective_limit_always_in_range() {
    let limits = RowLimits::default();
    let mut rng = rand::thread_rng();
    for _ in 0..ITERATIONS {
        let requested: i64 = rng.r#gen();
        let effective = limits.effective(Some(requested));
        assert!((1..=MAX_ROW_LIMIT).contains(&effective));
    }
}
