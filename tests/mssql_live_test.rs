//! Integration tests against a live SQL Server.
//!
//! Set SQL_GATEWAY_TEST_CONNECTION_STRING (ADO.NET format) to run them;
//! otherwise every test returns early.

use serde_json::json;
use sql_gateway::db::{MssqlBackend, PoolOptions, SqlBackend, TdsConnector};
use sql_gateway::discovery::SchemaResolver;
use sql_gateway::models::{RowLimits, SchemaMode};
use sql_gateway::tools::{QueryInput, QueryToolHandler};
use std::sync::Arc;

fn live_backend() -> Option<Arc<MssqlBackend>> {
    let connection_string = match std::env::var("SQL_GATEWAY_TEST_CONNECTION_STRING") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("Skipping test: SQL_GATEWAY_TEST_CONNECTION_STRING not set");
            return None;
        }
    };
    let connector = TdsConnector::from_connection_string(&connection_string).unwrap();
    Some(Arc::new(MssqlBackend::new(connector, PoolOptions::default())))
}

#[tokio::test]
async fn test_mssql_utf8_and_typed_params() {
    let Some(backend) = live_backend() else {
        return;
    };
    let handler = QueryToolHandler::new(backend.clone(), RowLimits::default(), 200);

    let input: QueryInput = serde_json::from_value(json!({
        "sql": "SELECT N'中文测试 ✓' AS label, :n AS n, :flag AS flag, :ratio AS ratio, :since AS since, :name AS name",
        "params": {
            "n": 42,
            "flag": true,
            "ratio": 0.25,
            "since": "2024-05-01T08:30:00Z",
            "name": "Zoë"
        }
    }))
    .unwrap();
    let output = handler.query(input).await.unwrap();

    assert_eq!(output.row_count, 1);
    let row = &output.rows[0];
    assert_eq!(row["label"], "中文测试 ✓");
    assert_eq!(row["n"], 42);
    assert_eq!(row["flag"], true);
    assert_eq!(row["ratio"], 0.25);
    assert_eq!(row["name"], "Zoë");
    assert!(row["since"].as_str().unwrap().starts_with("2024-05-01T08:30:00"));

    backend.close();
}

#[tokio::test]
async fn test_mssql_row_limit_is_enforced() {
    let Some(backend) = live_backend() else {
        return;
    };
    let handler = QueryToolHandler::new(backend.clone(), RowLimits::default(), 200);

    let input: QueryInput = serde_json::from_value(json!({
        "sql": "SELECT o.object_id FROM sys.all_objects AS o",
        "rowLimit": 7
    }))
    .unwrap();
    let output = handler.query(input).await.unwrap();

    assert_eq!(output.sql_used, "SELECT TOP(7) o.object_id FROM sys.all_objects AS o");
    assert_eq!(output.row_count, 7);
    assert!(output.truncated);
}

#[tokio::test]
async fn test_mssql_execution_error_keeps_server_message() {
    let Some(backend) = live_backend() else {
        return;
    };
    let handler = QueryToolHandler::new(backend, RowLimits::default(), 200);

    let input: QueryInput =
        serde_json::from_value(json!({"sql": "SELECT * FROM dbo.table_that_does_not_exist"})).unwrap();
    let err = handler.query(input).await.unwrap_err();

    assert_eq!(err.kind(), "execution");
    assert!(err.to_string().contains("table_that_does_not_exist"));
}

#[tokio::test]
async fn test_mssql_fallback_excludes_system_schemas() {
    let Some(backend) = live_backend() else {
        return;
    };
    let policy = sql_gateway::Config::default().policy();
    let resolver = SchemaResolver::new(backend, policy);

    let resolved = resolver.resolve(SchemaMode::Both, &[]).await.unwrap();

    assert!(resolved.fallback);
    assert!(
        resolved
            .relations
            .iter()
            .all(|r| !r.schema.eq_ignore_ascii_case("sys")
                && !r.schema.eq_ignore_ascii_case("INFORMATION_SCHEMA"))
    );
}
