//! Shared fixtures for integration tests.
//!
//! `FakeServer` is an in-memory stand-in for SQL Server: it answers the
//! catalog queries the gateway issues from a small fixed catalog, honouring
//! the JSON-list bindings the way `OPENJSON` would, and records every
//! statement it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value as JsonValue, json};
use sql_gateway::db::{RowSet, SqlBackend, Statement, WireValue};
use sql_gateway::error::GatewayResult;
use sql_gateway::models::RelationKind;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeColumn {
    pub name: &'static str,
    pub data_type: &'static str,
    pub nullable: bool,
    pub max_length: Option<i32>,
    pub primary_key: bool,
}

pub fn col(name: &'static str, data_type: &'static str) -> FakeColumn {
    FakeColumn {
        name,
        data_type,
        nullable: true,
        max_length: None,
        primary_key: false,
    }
}

pub fn pk(name: &'static str) -> FakeColumn {
    FakeColumn {
        name,
        data_type: "int",
        nullable: false,
        max_length: None,
        primary_key: true,
    }
}

#[derive(Debug, Clone)]
pub struct FakeRelation {
    pub schema: &'static str,
    pub name: &'static str,
    pub kind: RelationKind,
    pub columns: Vec<FakeColumn>,
}

#[derive(Debug, Clone)]
pub struct FakeForeignKey {
    pub table: (&'static str, &'static str),
    pub column: &'static str,
    pub target: (&'static str, &'static str),
    pub target_column: &'static str,
}

pub struct FakeServer {
    pub relations: Vec<FakeRelation>,
    pub foreign_keys: Vec<FakeForeignKey>,
    /// Answer for any statement that is not a catalog query.
    pub query_rows: RowSet,
    statements: Mutex<Vec<Statement>>,
}

impl FakeServer {
    pub fn new(relations: Vec<FakeRelation>, foreign_keys: Vec<FakeForeignKey>) -> Self {
        Self {
            relations,
            foreign_keys,
            query_rows: RowSet::new(vec![], vec![]),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn with_query_rows(mut self, columns: &[&str], rows: Vec<Vec<JsonValue>>) -> Self {
        self.query_rows = RowSet::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        self
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    fn answer(&self, statement: &Statement) -> RowSet {
        let sql = statement.sql.as_str();
        if sql.contains("FROM sys.views") {
            let pattern = like_regex(&text_binding(statement, "pattern"));
            self.relation_rows(|r| r.kind == RelationKind::View && pattern.is_match(r.name), false)
        } else if sql.contains("FROM sys.tables") {
            let schemas = list_binding(statement, "schemas");
            self.relation_rows(
                |r| r.kind == RelationKind::Table && contains_ci(&schemas, r.schema),
                false,
            )
        } else if sql.contains("FROM sys.objects o") {
            let types = list_binding(statement, "types");
            let excluded = list_binding(statement, "excluded");
            self.relation_rows(
                |r| {
                    contains_ci(&types, r.kind.object_type_code())
                        && !contains_ci(&excluded, r.schema)
                },
                true,
            )
        } else if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            self.column_rows(&list_binding(statement, "relations"))
        } else if sql.contains("INFORMATION_SCHEMA.TABLE_CONSTRAINTS") {
            self.key_rows(&list_binding(statement, "relations"))
        } else if sql.contains("sys.foreign_key_columns") {
            self.foreign_key_rows(&list_binding(statement, "relations"))
        } else {
            let mut rows = self.query_rows.clone();
            if let Some(max) = statement.max_rows {
                rows.rows.truncate(max);
            }
            rows
        }
    }

    fn relation_rows(&self, keep: impl Fn(&FakeRelation) -> bool, with_type: bool) -> RowSet {
        let mut columns = vec!["schema_name".to_string(), "object_name".to_string()];
        if with_type {
            columns.push("object_type".to_string());
        }
        let rows = self
            .relations
            .iter()
            .filter(|r| keep(r))
            .map(|r| {
                let mut row = vec![json!(r.schema), json!(r.name)];
                if with_type {
                    row.push(json!(r.kind.object_type_code()));
                }
                row
            })
            .collect();
        RowSet::new(columns, rows)
    }

    fn scoped<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a FakeRelation> + 'a {
        self.relations
            .iter()
            .filter(move |r| contains_ci(names, &format!("{}.{}", r.schema, r.name)))
    }

    fn column_rows(&self, names: &[String]) -> RowSet {
        let mut rows = Vec::new();
        for relation in self.scoped(names) {
            // Deliberately out of ordinal order; the gateway must sort.
            for (i, c) in relation.columns.iter().enumerate().rev() {
                rows.push(vec![
                    json!(relation.schema),
                    json!(relation.name),
                    json!(c.name),
                    json!(c.data_type),
                    json!(if c.nullable { "YES" } else { "NO" }),
                    c.max_length.map(JsonValue::from).unwrap_or(JsonValue::Null),
                    json!(i + 1),
                ]);
            }
        }
        RowSet::new(
            [
                "table_schema",
                "table_name",
                "column_name",
                "data_type",
                "is_nullable",
                "max_length",
                "ordinal_position",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows,
        )
    }

    fn key_rows(&self, names: &[String]) -> RowSet {
        let rows = self
            .scoped(names)
            .flat_map(|r| {
                r.columns
                    .iter()
                    .filter(|c| c.primary_key)
                    .map(move |c| vec![json!(r.schema), json!(r.name), json!(c.name)])
            })
            .collect();
        RowSet::new(
            vec!["table_schema".into(), "table_name".into(), "column_name".into()],
            rows,
        )
    }

    fn foreign_key_rows(&self, names: &[String]) -> RowSet {
        let rows = self
            .foreign_keys
            .iter()
            .filter(|fk| contains_ci(names, &format!("{}.{}", fk.table.0, fk.table.1)))
            .map(|fk| {
                vec![
                    json!(fk.table.0),
                    json!(fk.table.1),
                    json!(fk.column),
                    json!(fk.target.0),
                    json!(fk.target.1),
                    json!(fk.target_column),
                ]
            })
            .collect();
        RowSet::new(
            [
                "table_schema",
                "table_name",
                "column_name",
                "ref_schema",
                "ref_table",
                "ref_column",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows,
        )
    }
}

#[async_trait]
impl SqlBackend for FakeServer {
    async fn execute(&self, statement: &Statement) -> GatewayResult<RowSet> {
        self.statements.lock().unwrap().push(statement.clone());
        Ok(self.answer(statement))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn text_binding(statement: &Statement, name: &str) -> String {
    statement
        .bindings
        .iter()
        .find(|b| b.name == name)
        .and_then(|b| match &b.value {
            WireValue::Text(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("missing text binding @{}", name))
}

fn list_binding(statement: &Statement, name: &str) -> Vec<String> {
    serde_json::from_str(&text_binding(statement, name)).expect("binding is a JSON string array")
}

fn contains_ci(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v.eq_ignore_ascii_case(value))
}

/// SQL `LIKE` with `%` and `_`, case-insensitive like the default collation.
fn like_regex(pattern: &str) -> Regex {
    let mut re = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).unwrap()
}

/// A small AdventureWorks-like catalog with system schemas mixed in.
pub fn adventure_works() -> FakeServer {
    let relations = vec![
        FakeRelation {
            schema: "SalesLT",
            name: "Customer",
            kind: RelationKind::Table,
            columns: vec![
                pk("CustomerID"),
                FakeColumn {
                    max_length: Some(50),
                    ..col("FirstName", "nvarchar")
                },
                FakeColumn {
                    max_length: Some(50),
                    ..col("EmailAddress", "nvarchar")
                },
            ],
        },
        FakeRelation {
            schema: "SalesLT",
            name: "CustomerAddress",
            kind: RelationKind::Table,
            columns: vec![pk("CustomerID"), pk("AddressID"), col("AddressType", "nvarchar")],
        },
        FakeRelation {
            schema: "SalesLT",
            name: "Address",
            kind: RelationKind::Table,
            columns: vec![pk("AddressID"), col("City", "nvarchar")],
        },
        FakeRelation {
            schema: "SalesLT",
            name: "SalesOrderHeader",
            kind: RelationKind::Table,
            columns: vec![
                pk("SalesOrderID"),
                col("CustomerID", "int"),
                col("ShipToAddressID", "int"),
                col("BillToAddressID", "int"),
                col("OrderDate", "datetime"),
            ],
        },
        FakeRelation {
            schema: "SalesLT",
            name: "vwProductCatalog",
            kind: RelationKind::View,
            columns: vec![col("ProductID", "int"), col("Name", "nvarchar")],
        },
        FakeRelation {
            schema: "dbo",
            name: "vwUsers",
            kind: RelationKind::View,
            columns: vec![col("UserID", "int"), col("UserName", "nvarchar")],
        },
        FakeRelation {
            schema: "dbo",
            name: "ErrorLog",
            kind: RelationKind::Table,
            columns: vec![pk("ErrorLogID"), col("ErrorMessage", "nvarchar")],
        },
        FakeRelation {
            schema: "sys",
            name: "trace_xe_action_map",
            kind: RelationKind::Table,
            columns: vec![col("trace_column_id", "smallint")],
        },
        FakeRelation {
            schema: "INFORMATION_SCHEMA",
            name: "TABLES",
            kind: RelationKind::View,
            columns: vec![col("TABLE_NAME", "nvarchar")],
        },
    ];

    let foreign_keys = vec![
        FakeForeignKey {
            table: ("SalesLT", "SalesOrderHeader"),
            column: "CustomerID",
            target: ("SalesLT", "Customer"),
            target_column: "CustomerID",
        },
        FakeForeignKey {
            table: ("SalesLT", "SalesOrderHeader"),
            column: "ShipToAddressID",
            target: ("SalesLT", "Address"),
            target_column: "AddressID",
        },
        FakeForeignKey {
            table: ("SalesLT", "SalesOrderHeader"),
            column: "BillToAddressID",
            target: ("SalesLT", "Address"),
            target_column: "AddressID",
        },
        FakeForeignKey {
            table: ("SalesLT", "CustomerAddress"),
            column: "CustomerID",
            target: ("SalesLT", "Customer"),
            target_column: "CustomerID",
        },
    ];

    FakeServer::new(relations, foreign_keys)
}
