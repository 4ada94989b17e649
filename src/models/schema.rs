//! Schema-related data models.
//!
//! This module defines the relation, column and key types produced by schema
//! discovery, plus the catalog document handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Kind of relation a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationKind {
    Table,
    View,
}

impl RelationKind {
    /// Parse a kind from a catalog `type_desc` / `TABLE_TYPE` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "U" | "TABLE" | "BASE TABLE" | "USER_TABLE" => Some(Self::Table),
            "V" | "VIEW" => Some(Self::View),
            _ => None,
        }
    }

    /// `sys.objects.type` code for this kind.
    pub fn object_type_code(&self) -> &'static str {
        match self {
            Self::Table => "U",
            Self::View => "V",
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "TABLE"),
            Self::View => write!(f, "VIEW"),
        }
    }
}

/// Which relation kinds a schema request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    Views,
    Tables,
    #[default]
    Both,
}

impl SchemaMode {
    pub fn includes_views(&self) -> bool {
        matches!(self, Self::Views | Self::Both)
    }

    pub fn includes_tables(&self) -> bool {
        matches!(self, Self::Tables | Self::Both)
    }

    pub fn includes(&self, kind: RelationKind) -> bool {
        match kind {
            RelationKind::Table => self.includes_tables(),
            RelationKind::View => self.includes_views(),
        }
    }
}

/// Identity of a table or view. Equality and ordering use (schema, name) only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub schema: String,
    pub name: String,
    pub kind: RelationKind,
}

impl RelationDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }

    /// `schema.name`, the key used to join introspection results.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    fn key(&self) -> (&str, &str) {
        (&self.schema, &self.name)
    }
}

impl PartialEq for RelationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RelationDescriptor {}

impl PartialOrd for RelationDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelationDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Quote an identifier with T-SQL brackets, doubling any closing bracket.
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type name as declared, e.g. `nvarchar`, `int`
    pub declared_type: String,
    pub nullable: bool,
    /// Character length; -1 for `(max)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            max_length: None,
            is_primary_key: false,
            description: None,
        }
    }

    pub fn with_max_length(mut self, max_length: i32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Directed foreign-key edge owned by the source relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub source_column: String,
    /// `schema.name` of the referenced relation
    pub target_relation: String,
    pub target_column: String,
}

impl ForeignKeyEdge {
    pub fn new(
        source_column: impl Into<String>,
        target_relation: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target_relation: target_relation.into(),
            target_column: target_column.into(),
        }
    }
}

/// A described, ready-to-adapt SQL snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryTemplate {
    pub description: String,
    pub template: String,
}

impl QueryTemplate {
    pub fn new(description: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            template: template.into(),
        }
    }
}

/// Everything the catalog says about one relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEntry {
    pub relation: RelationDescriptor,
    pub description: String,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<ForeignKeyEdge>,
    pub sample_joins: Vec<QueryTemplate>,
}

impl RelationEntry {
    /// Names of the primary key columns, in column order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub relations: Vec<RelationEntry>,
    pub common_queries: Vec<QueryTemplate>,
    pub generated_at_utc: DateTime<Utc>,
    pub notes: String,
}

impl SchemaCatalog {
    /// Look up an entry by `schema.name`.
    pub fn relation(&self, qualified_name: &str) -> Option<&RelationEntry> {
        self.relations
            .iter()
            .find(|e| e.relation.qualified_name() == qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_kind_parse() {
        assert_eq!(RelationKind::parse("U"), Some(RelationKind::Table));
        assert_eq!(RelationKind::parse("BASE TABLE"), Some(RelationKind::Table));
        assert_eq!(RelationKind::parse("view"), Some(RelationKind::View));
        assert_eq!(RelationKind::parse("P"), None);
    }

    #[test]
    fn test_relation_identity_ignores_kind() {
        let a = RelationDescriptor::new("dbo", "Users", RelationKind::Table);
        let b = RelationDescriptor::new("dbo", "Users", RelationKind::View);
        assert_eq!(a, b);
    }

    #[test]
    fn test_relation_ordering() {
        let mut rels = vec![
            RelationDescriptor::new("SalesLT", "Product", RelationKind::Table),
            RelationDescriptor::new("dbo", "vwUsers", RelationKind::View),
            RelationDescriptor::new("SalesLT", "Customer", RelationKind::Table),
        ];
        rels.sort();
        let names: Vec<_> = rels.iter().map(|r| r.qualified_name()).collect();
        assert_eq!(names, ["SalesLT.Customer", "SalesLT.Product", "dbo.vwUsers"]);
    }

    #[test]
    fn test_quote_ident_escapes_brackets() {
        assert_eq!(quote_ident("odd]name"), "[odd]]name]");
        assert_eq!(quote_ident("Customer"), "[Customer]");
    }

    #[test]
    fn test_schema_mode() {
        assert!(SchemaMode::Both.includes_views());
        assert!(SchemaMode::Both.includes_tables());
        assert!(!SchemaMode::Views.includes(RelationKind::Table));
        assert!(SchemaMode::Tables.includes(RelationKind::Table));
        assert_eq!(SchemaMode::default(), SchemaMode::Both);
    }

    #[test]
    fn test_relation_kind_serializes_uppercase() {
        let json = serde_json::to_string(&RelationKind::View).unwrap();
        assert_eq!(json, "\"VIEW\"");
    }
}
