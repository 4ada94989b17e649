//! Schema discovery tools.
//!
//! This module implements the `describe_schema` and `list_relations` MCP tools.

use crate::audit::AuditScope;
use crate::discovery::{MetadataAssembler, ResolvedRelations, SchemaResolver};
use crate::error::GatewayResult;
use crate::models::{
    ColumnDescriptor, ForeignKeyEdge, QueryTemplate, RelationEntry, SchemaCatalog, SchemaMode,
};
use chrono::SecondsFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for the describe_schema and list_relations tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SchemaScopeInput {
    /// Relation kinds to include: "views", "tables" or "both". Default: "both"
    #[serde(default)]
    pub mode: Option<SchemaMode>,
    /// Tables to include, as "schema.name" or "schema.*". Narrows the server allow-list; cannot widen it.
    #[serde(default, alias = "allowList")]
    pub tables: Vec<String>,
}

/// Output from the describe_schema tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeSchemaOutput {
    pub tables: Vec<TableOutput>,
    /// Reusable templates with {table} / {column} placeholders
    pub common_queries: Vec<QueryTemplate>,
    /// RFC 3339 timestamp
    pub generated_at_utc: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableOutput {
    /// Qualified name: schema.name
    pub name: String,
    /// "TABLE" or "VIEW"
    pub kind: String,
    /// Human-written description; empty if none
    pub description: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnOutput>,
    /// Outgoing foreign keys
    pub fks: Vec<ForeignKeyOutput>,
    /// Ready-to-run join examples along foreign keys (at most 2)
    pub sample_joins: Vec<QueryTemplate>,
}

impl From<RelationEntry> for TableOutput {
    fn from(entry: RelationEntry) -> Self {
        Self {
            name: entry.relation.qualified_name(),
            kind: entry.relation.kind.to_string(),
            description: entry.description,
            columns: entry.columns.into_iter().map(Into::into).collect(),
            fks: entry.foreign_keys.into_iter().map(Into::into).collect(),
            sample_joins: entry.sample_joins,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub pk: bool,
    pub nullable: bool,
    /// Character length; -1 means (max)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<ColumnDescriptor> for ColumnOutput {
    fn from(col: ColumnDescriptor) -> Self {
        Self {
            name: col.name,
            data_type: col.declared_type,
            pk: col.is_primary_key,
            nullable: col.nullable,
            max_len: col.max_length,
            description: col.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ForeignKeyOutput {
    pub column: String,
    /// Referenced relation: schema.name
    pub ref_table: String,
    pub ref_column: String,
}

impl From<ForeignKeyEdge> for ForeignKeyOutput {
    fn from(edge: ForeignKeyEdge) -> Self {
        Self {
            column: edge.source_column,
            ref_table: edge.target_relation,
            ref_column: edge.target_column,
        }
    }
}

impl From<SchemaCatalog> for DescribeSchemaOutput {
    fn from(catalog: SchemaCatalog) -> Self {
        Self {
            tables: catalog.relations.into_iter().map(Into::into).collect(),
            common_queries: catalog.common_queries,
            generated_at_utc: catalog
                .generated_at_utc
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            notes: catalog.notes,
        }
    }
}

/// Output from the list_relations tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListRelationsOutput {
    pub relations: Vec<RelationOutput>,
    pub count: usize,
    /// True if no pattern or allow-list matched and the catalog fallback was used
    pub fallback: bool,
    /// Allow-list entries that were skipped, with reasons
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RelationOutput {
    /// Qualified name: schema.name
    pub name: String,
    /// "TABLE" or "VIEW"
    pub kind: String,
}

impl From<ResolvedRelations> for ListRelationsOutput {
    fn from(resolved: ResolvedRelations) -> Self {
        let relations: Vec<RelationOutput> = resolved
            .relations
            .iter()
            .map(|r| RelationOutput {
                name: r.qualified_name(),
                kind: r.kind.to_string(),
            })
            .collect();
        Self {
            count: relations.len(),
            relations,
            fallback: resolved.fallback,
            skipped: resolved.skipped,
        }
    }
}

/// Handler for schema discovery tools.
pub struct SchemaToolHandler {
    resolver: Arc<SchemaResolver>,
    assembler: Arc<MetadataAssembler>,
    log_sql_max_len: usize,
}

impl SchemaToolHandler {
    pub fn new(
        resolver: Arc<SchemaResolver>,
        assembler: Arc<MetadataAssembler>,
        log_sql_max_len: usize,
    ) -> Self {
        Self {
            resolver,
            assembler,
            log_sql_max_len,
        }
    }

    /// Handle the describe_schema tool call.
    pub async fn describe_schema(&self, input: SchemaScopeInput) -> GatewayResult<DescribeSchemaOutput> {
        let audit = AuditScope::schema("describe_schema", input.tables.len());
        let result = async {
            let resolved = self
                .resolver
                .resolve(input.mode.unwrap_or_default(), &input.tables)
                .await?;
            self.assembler.assemble(&resolved).await
        }
        .await;

        match result {
            Ok(catalog) => {
                audit.success(None, catalog.relations.len(), self.log_sql_max_len);
                Ok(catalog.into())
            }
            Err(e) => {
                audit.failure(None, &e, self.log_sql_max_len);
                Err(e)
            }
        }
    }

    /// Handle the list_relations tool call.
    pub async fn list_relations(&self, input: SchemaScopeInput) -> GatewayResult<ListRelationsOutput> {
        let audit = AuditScope::schema("list_relations", input.tables.len());
        match self
            .resolver
            .resolve(input.mode.unwrap_or_default(), &input.tables)
            .await
        {
            Ok(resolved) => {
                audit.success(None, resolved.relations.len(), self.log_sql_max_len);
                Ok(resolved.into())
            }
            Err(e) => {
                audit.failure(None, &e, self.log_sql_max_len);
                Err(e)
            }
        }
    }
}
