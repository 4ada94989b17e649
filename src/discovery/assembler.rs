//! Catalog assembly from scoped introspection queries.

use crate::db::SqlBackend;
use crate::db::schema::{ColumnRow, ForeignKeyRow, SchemaInspector};
use crate::discovery::descriptions::Descriptions;
use crate::discovery::resolver::ResolvedRelations;
use crate::error::GatewayResult;
use crate::models::{
    ColumnDescriptor, ForeignKeyEdge, QueryTemplate, RelationEntry, SchemaCatalog, quote_ident,
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Sample joins generated per relation.
pub const MAX_SAMPLE_JOINS: usize = 2;

/// Rows returned by a generated sample join.
pub const SAMPLE_JOIN_ROWS: u32 = 10;

/// Fixed templates with `{table}` / `{column}` placeholders.
pub fn common_queries() -> Vec<QueryTemplate> {
    vec![
        QueryTemplate::new("Row count", "SELECT COUNT(*) AS row_count FROM {table}"),
        QueryTemplate::new("Preview rows", "SELECT TOP(20) * FROM {table}"),
        QueryTemplate::new(
            "Row count per distinct value",
            "SELECT TOP(20) {column}, COUNT(*) AS row_count FROM {table} GROUP BY {column} ORDER BY row_count DESC",
        ),
    ]
}

pub struct MetadataAssembler {
    backend: Arc<dyn SqlBackend>,
    descriptions: Arc<Descriptions>,
}

impl MetadataAssembler {
    pub fn new(backend: Arc<dyn SqlBackend>, descriptions: Arc<Descriptions>) -> Self {
        Self {
            backend,
            descriptions,
        }
    }

    /// Build the catalog for the resolved relations.
    ///
    /// Issues exactly three introspection queries, or none for an empty set.
    pub async fn assemble(&self, resolved: &ResolvedRelations) -> GatewayResult<SchemaCatalog> {
        let notes = self.notes(resolved);

        if resolved.is_empty() {
            return Ok(SchemaCatalog {
                relations: Vec::new(),
                common_queries: common_queries(),
                generated_at_utc: Utc::now(),
                notes,
            });
        }

        let names = resolved.qualified_names();
        let backend = self.backend.as_ref();
        let (columns, primary_keys, foreign_keys) = tokio::try_join!(
            SchemaInspector::columns(backend, &names),
            SchemaInspector::primary_keys(backend, &names),
            SchemaInspector::foreign_keys(backend, &names),
        )?;

        let mut columns_by_table: HashMap<String, Vec<ColumnRow>> = HashMap::new();
        for column in columns {
            columns_by_table
                .entry(column.qualified_table())
                .or_default()
                .push(column);
        }

        let pk_columns: HashSet<(String, String)> = primary_keys
            .into_iter()
            .map(|k| (k.qualified_table(), k.column))
            .collect();

        let mut fks_by_table: HashMap<String, Vec<ForeignKeyRow>> = HashMap::new();
        for fk in foreign_keys {
            fks_by_table.entry(fk.qualified_table()).or_default().push(fk);
        }

        let relations = resolved
            .relations
            .iter()
            .map(|relation| {
                let qualified = relation.qualified_name();

                let mut rows = columns_by_table.remove(&qualified).unwrap_or_default();
                rows.sort_by_key(|c| c.ordinal);
                let columns = rows
                    .into_iter()
                    .map(|c| {
                        let is_pk = pk_columns.contains(&(qualified.clone(), c.column.clone()));
                        let mut col = ColumnDescriptor::new(&c.column, &c.data_type, c.nullable)
                            .with_primary_key(is_pk);
                        if let Some(len) = c.max_length {
                            col = col.with_max_length(len);
                        }
                        if let Some(text) = self.descriptions.column(&qualified, &c.column) {
                            col = col.with_description(text);
                        }
                        col
                    })
                    .collect();

                let fks = fks_by_table.remove(&qualified).unwrap_or_default();
                let sample_joins = fks
                    .iter()
                    .take(MAX_SAMPLE_JOINS)
                    .map(sample_join)
                    .collect();
                let foreign_keys = fks
                    .into_iter()
                    .map(|fk| {
                        let target = fk.qualified_ref_table();
                        ForeignKeyEdge::new(fk.column, target, fk.ref_column)
                    })
                    .collect();

                RelationEntry {
                    relation: relation.clone(),
                    description: self.descriptions.table(&qualified).to_string(),
                    columns,
                    foreign_keys,
                    sample_joins,
                }
            })
            .collect::<Vec<_>>();

        debug!(relations = relations.len(), "Assembled schema catalog");

        Ok(SchemaCatalog {
            relations,
            common_queries: common_queries(),
            generated_at_utc: Utc::now(),
            notes,
        })
    }

    fn notes(&self, resolved: &ResolvedRelations) -> String {
        let mut notes = Vec::new();
        if resolved.fallback {
            notes.push(
                "No view pattern or allow-list entry matched; relations come from the catalog fallback over user objects."
                    .to_string(),
            );
        } else if resolved.is_empty() {
            notes.push("No relations are visible for this request.".to_string());
        }
        if !resolved.skipped.is_empty() {
            notes.push(format!("Skipped: {}.", resolved.skipped.join("; ")));
        }
        notes.push(self.descriptions.source_note());
        notes.join(" ")
    }
}

/// Two-alias inner join along one foreign-key edge.
fn sample_join(fk: &ForeignKeyRow) -> QueryTemplate {
    let source = format!("{}.{}", quote_ident(&fk.schema), quote_ident(&fk.table));
    let target = format!("{}.{}", quote_ident(&fk.ref_schema), quote_ident(&fk.ref_table));
    QueryTemplate::new(
        format!(
            "{} joined to {} on {} = {}",
            fk.qualified_table(),
            fk.qualified_ref_table(),
            fk.column,
            fk.ref_column
        ),
        format!(
            "SELECT TOP({}) a.*, b.* FROM {} AS a INNER JOIN {} AS b ON a.{} = b.{}",
            SAMPLE_JOIN_ROWS,
            source,
            target,
            quote_ident(&fk.column),
            quote_ident(&fk.ref_column)
        ),
    )
}
