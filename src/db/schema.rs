//! Schema introspection module.
//!
//! Catalog queries for SQL Server. Every query is a single round trip; lists
//! (relation names, schemas, object types) are bound as one JSON array text
//! parameter and expanded server-side with `OPENJSON`, so the statement text
//! never contains caller-controlled identifiers.
//!
//! # Architecture
//!
//! SQL text lives in the `queries` submodule. `SchemaInspector` builds the
//! statement, runs it through a [`SqlBackend`] and maps the row set onto the
//! typed row structs below.

use crate::db::backend::{RowSet, SqlBackend, Statement};
use crate::db::params::{Binding, WireValue};
use crate::error::GatewayResult;
use crate::models::{RelationDescriptor, RelationKind};
use serde_json::Value as JsonValue;
use tracing::debug;

// =============================================================================
// SQL Query Templates
// =============================================================================

pub(crate) mod queries {
    /// User views whose name matches a LIKE pattern.
    pub const VIEWS_LIKE: &str = r#"
        SELECT s.name AS schema_name, v.name AS object_name
        FROM sys.views v
        JOIN sys.schemas s ON s.schema_id = v.schema_id
        WHERE v.is_ms_shipped = 0
          AND v.name LIKE @pattern
        ORDER BY s.name, v.name
    "#;

    /// User tables in the given schemas.
    pub const TABLES_IN_SCHEMAS: &str = r#"
        SELECT s.name AS schema_name, t.name AS object_name
        FROM sys.tables t
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        WHERE t.is_ms_shipped = 0
          AND s.name IN (SELECT [value] FROM OPENJSON(@schemas))
        ORDER BY s.name, t.name
    "#;

    /// Catalog fallback: every user object of the given types outside excluded schemas.
    pub const USER_OBJECTS: &str = r#"
        SELECT s.name AS schema_name, o.name AS object_name, RTRIM(o.type) AS object_type
        FROM sys.objects o
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        WHERE o.is_ms_shipped = 0
          AND RTRIM(o.type) IN (SELECT [value] FROM OPENJSON(@types))
          AND s.name NOT IN (SELECT [value] FROM OPENJSON(@excluded))
        ORDER BY s.name, o.name
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            c.TABLE_SCHEMA AS table_schema,
            c.TABLE_NAME AS table_name,
            c.COLUMN_NAME AS column_name,
            c.DATA_TYPE AS data_type,
            c.IS_NULLABLE AS is_nullable,
            c.CHARACTER_MAXIMUM_LENGTH AS max_length,
            c.ORDINAL_POSITION AS ordinal_position
        FROM INFORMATION_SCHEMA.COLUMNS c
        WHERE CONCAT(c.TABLE_SCHEMA, '.', c.TABLE_NAME) IN (SELECT [value] FROM OPENJSON(@relations))
        ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION
    "#;

    pub const PRIMARY_KEYS: &str = r#"
        SELECT
            tc.TABLE_SCHEMA AS table_schema,
            tc.TABLE_NAME AS table_name,
            kcu.COLUMN_NAME AS column_name
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            AND kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
            AND kcu.TABLE_NAME = tc.TABLE_NAME
        WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
          AND CONCAT(tc.TABLE_SCHEMA, '.', tc.TABLE_NAME) IN (SELECT [value] FROM OPENJSON(@relations))
        ORDER BY tc.TABLE_SCHEMA, tc.TABLE_NAME, kcu.ORDINAL_POSITION
    "#;

    pub const FOREIGN_KEYS: &str = r#"
        SELECT
            ps.name AS table_schema,
            po.name AS table_name,
            pc.name AS column_name,
            rs.name AS ref_schema,
            ro.name AS ref_table,
            rc.name AS ref_column
        FROM sys.foreign_key_columns fkc
        JOIN sys.objects po ON po.object_id = fkc.parent_object_id
        JOIN sys.schemas ps ON ps.schema_id = po.schema_id
        JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
        JOIN sys.objects ro ON ro.object_id = fkc.referenced_object_id
        JOIN sys.schemas rs ON rs.schema_id = ro.schema_id
        JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
        WHERE CONCAT(ps.name, '.', po.name) IN (SELECT [value] FROM OPENJSON(@relations))
        ORDER BY ps.name, po.name, fkc.constraint_object_id, fkc.constraint_column_id
    "#;
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRow {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub nullable: bool,
    pub max_length: Option<i32>,
    pub ordinal: i64,
}

impl ColumnRow {
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyColumnRow {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl KeyColumnRow {
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRow {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub ref_schema: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl ForeignKeyRow {
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn qualified_ref_table(&self) -> String {
        format!("{}.{}", self.ref_schema, self.ref_table)
    }
}

// =============================================================================
// Inspector
// =============================================================================

/// Schema inspector for catalog introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// User views whose name matches `pattern` (SQL `LIKE`).
    pub async fn views_like(
        backend: &dyn SqlBackend,
        pattern: &str,
    ) -> GatewayResult<Vec<RelationDescriptor>> {
        let stmt = Statement::new(queries::VIEWS_LIKE)
            .with_bindings(vec![text_binding("pattern", pattern.to_string())]);
        let rows = backend.execute(&stmt).await?;
        Ok(relations(&rows, |_| Some(RelationKind::View)))
    }

    /// User tables living in any of `schemas`.
    pub async fn tables_in_schemas(
        backend: &dyn SqlBackend,
        schemas: &[String],
    ) -> GatewayResult<Vec<RelationDescriptor>> {
        let stmt = Statement::new(queries::TABLES_IN_SCHEMAS)
            .with_bindings(vec![json_list_binding("schemas", schemas)]);
        let rows = backend.execute(&stmt).await?;
        Ok(relations(&rows, |_| Some(RelationKind::Table)))
    }

    /// Every user object of `kinds` outside `excluded_schemas`.
    pub async fn user_objects(
        backend: &dyn SqlBackend,
        excluded_schemas: &[String],
        kinds: &[RelationKind],
    ) -> GatewayResult<Vec<RelationDescriptor>> {
        let types: Vec<String> = kinds
            .iter()
            .map(|k| k.object_type_code().to_string())
            .collect();
        let stmt = Statement::new(queries::USER_OBJECTS).with_bindings(vec![
            json_list_binding("types", &types),
            json_list_binding("excluded", excluded_schemas),
        ]);
        let rows = backend.execute(&stmt).await?;
        Ok(relations(&rows, |r| {
            r.str("object_type").and_then(RelationKind::parse)
        }))
    }

    /// Columns of the given relations (`schema.name`), in ordinal order.
    pub async fn columns(
        backend: &dyn SqlBackend,
        relations: &[String],
    ) -> GatewayResult<Vec<ColumnRow>> {
        let rows = Self::scoped(backend, queries::COLUMNS, relations).await?;
        let columns: Vec<ColumnRow> = rows
            .records()
            .map(|r| ColumnRow {
                schema: r.string("table_schema"),
                table: r.string("table_name"),
                column: r.string("column_name"),
                data_type: r.string("data_type"),
                nullable: r.bool("is_nullable").unwrap_or(true),
                max_length: r.i64("max_length").map(|n| n as i32),
                ordinal: r.i64("ordinal_position").unwrap_or_default(),
            })
            .collect();
        debug!(count = columns.len(), "Fetched columns");
        Ok(columns)
    }

    pub async fn primary_keys(
        backend: &dyn SqlBackend,
        relations: &[String],
    ) -> GatewayResult<Vec<KeyColumnRow>> {
        let rows = Self::scoped(backend, queries::PRIMARY_KEYS, relations).await?;
        Ok(rows
            .records()
            .map(|r| KeyColumnRow {
                schema: r.string("table_schema"),
                table: r.string("table_name"),
                column: r.string("column_name"),
            })
            .collect())
    }

    pub async fn foreign_keys(
        backend: &dyn SqlBackend,
        relations: &[String],
    ) -> GatewayResult<Vec<ForeignKeyRow>> {
        let rows = Self::scoped(backend, queries::FOREIGN_KEYS, relations).await?;
        Ok(rows
            .records()
            .map(|r| ForeignKeyRow {
                schema: r.string("table_schema"),
                table: r.string("table_name"),
                column: r.string("column_name"),
                ref_schema: r.string("ref_schema"),
                ref_table: r.string("ref_table"),
                ref_column: r.string("ref_column"),
            })
            .collect())
    }

    async fn scoped(
        backend: &dyn SqlBackend,
        sql: &str,
        relations: &[String],
    ) -> GatewayResult<RowSet> {
        let stmt = Statement::new(sql).with_bindings(vec![json_list_binding("relations", relations)]);
        backend.execute(&stmt).await
    }
}

fn text_binding(name: &str, value: String) -> Binding {
    Binding {
        name: name.to_string(),
        value: WireValue::Text(value),
    }
}

/// Bind a list as JSON array text for `OPENJSON`.
fn json_list_binding(name: &str, items: &[String]) -> Binding {
    text_binding(name, JsonValue::from(items.to_vec()).to_string())
}

fn relations(
    rows: &RowSet,
    kind_of: impl Fn(&crate::db::backend::Record<'_>) -> Option<RelationKind>,
) -> Vec<RelationDescriptor> {
    rows.records()
        .filter_map(|r| {
            let kind = kind_of(&r)?;
            let schema = r.str("schema_name")?;
            let name = r.str("object_name")?;
            Some(RelationDescriptor::new(schema, name, kind))
        })
        .collect()
}
