//! Relation resolution: which tables and views a schema request may see.
//!
//! Resolution is an ordered sequence of steps, each adding to one
//! de-duplicated set:
//!
//! 1. views whose name matches the configured `LIKE` pattern (mode includes views)
//! 2. tables named by allow-list entries (mode includes tables)
//! 3. catalog fallback over user objects, only when the set is still empty
//!
//! Bad allow-list entries never fail the request; they are logged and
//! reported back as skipped.

use crate::db::SqlBackend;
use crate::db::schema::SchemaInspector;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{RelationDescriptor, RelationKind, SchemaMode};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Server-side resolution settings.
#[derive(Debug, Clone, Default)]
pub struct ResolverPolicy {
    /// SQL `LIKE` pattern for exposed views, e.g. `vw%`
    pub view_pattern: Option<String>,
    /// Server allow-list (`schema.name` or `schema.*`)
    pub allow_list: Vec<String>,
    pub excluded_schemas: Vec<String>,
    pub included_kinds: Vec<RelationKind>,
}

/// One parsed allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowEntry {
    Exact { schema: String, name: String },
    Schema(String),
}

impl AllowEntry {
    /// Parse `schema.name` or `schema.*`, stripping `[` `]` around each part.
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        let entry = raw.trim();
        let parts: Vec<&str> = entry.split('.').map(strip_brackets).collect();
        match parts.as_slice() {
            [schema, name] if !schema.is_empty() && !name.is_empty() => {
                if schema.contains('*') {
                    Err(GatewayError::resolution(entry, "wildcard not allowed in schema part"))
                } else if *name == "*" {
                    Ok(AllowEntry::Schema(schema.to_string()))
                } else if name.contains('*') {
                    Err(GatewayError::resolution(entry, "only a bare '*' may follow the schema"))
                } else {
                    Ok(AllowEntry::Exact {
                        schema: schema.to_string(),
                        name: name.to_string(),
                    })
                }
            }
            [_, _] => Err(GatewayError::resolution(entry, "empty schema or name")),
            [_] => Err(GatewayError::resolution(entry, "expected 'schema.name' or 'schema.*'")),
            _ => Err(GatewayError::resolution(entry, "too many name parts")),
        }
    }

    pub fn schema(&self) -> &str {
        match self {
            AllowEntry::Exact { schema, .. } | AllowEntry::Schema(schema) => schema,
        }
    }

    /// Whether this entry admits `relation`. Comparison is case-insensitive.
    pub fn matches(&self, relation: &RelationDescriptor) -> bool {
        match self {
            AllowEntry::Exact { schema, name } => {
                schema.eq_ignore_ascii_case(&relation.schema)
                    && name.eq_ignore_ascii_case(&relation.name)
            }
            AllowEntry::Schema(schema) => schema.eq_ignore_ascii_case(&relation.schema),
        }
    }

    /// Whether every relation admitted by `other` is admitted by `self`.
    pub fn covers(&self, other: &AllowEntry) -> bool {
        match (self, other) {
            (AllowEntry::Schema(s), other) => s.eq_ignore_ascii_case(other.schema()),
            (
                AllowEntry::Exact { schema, name },
                AllowEntry::Exact {
                    schema: os,
                    name: on,
                },
            ) => schema.eq_ignore_ascii_case(os) && name.eq_ignore_ascii_case(on),
            (AllowEntry::Exact { .. }, AllowEntry::Schema(_)) => false,
        }
    }
}

impl std::fmt::Display for AllowEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllowEntry::Exact { schema, name } => write!(f, "{}.{}", schema, name),
            AllowEntry::Schema(schema) => write!(f, "{}.*", schema),
        }
    }
}

fn strip_brackets(part: &str) -> &str {
    let part = part.trim();
    part.strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .unwrap_or(part)
}

/// Result of resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRelations {
    /// Ordered by (schema, name)
    pub relations: Vec<RelationDescriptor>,
    /// True when step 3 supplied the relations
    pub fallback: bool,
    /// Human-readable reasons for skipped allow-list entries
    pub skipped: Vec<String>,
}

impl ResolvedRelations {
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn qualified_names(&self) -> Vec<String> {
        self.relations.iter().map(|r| r.qualified_name()).collect()
    }
}

pub struct SchemaResolver {
    backend: Arc<dyn SqlBackend>,
    policy: ResolverPolicy,
    server_entries: Vec<AllowEntry>,
}

impl SchemaResolver {
    /// Malformed server allow-list entries are dropped here, with a warning.
    pub fn new(backend: Arc<dyn SqlBackend>, policy: ResolverPolicy) -> Self {
        let server_entries = policy
            .allow_list
            .iter()
            .filter_map(|raw| match AllowEntry::parse(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Ignoring server allow-list entry");
                    None
                }
            })
            .collect();
        Self {
            backend,
            policy,
            server_entries,
        }
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Resolve the relations visible to one request.
    pub async fn resolve(
        &self,
        mode: SchemaMode,
        requested: &[String],
    ) -> GatewayResult<ResolvedRelations> {
        let mut found: BTreeSet<RelationDescriptor> = BTreeSet::new();
        let mut skipped = Vec::new();

        // Step 1: pattern-matched views
        if mode.includes_views() {
            if let Some(pattern) = self.policy.view_pattern.as_deref().filter(|p| !p.is_empty()) {
                let views = SchemaInspector::views_like(self.backend.as_ref(), pattern).await?;
                debug!(pattern, count = views.len(), "Views matched pattern");
                found.extend(views);
            }
        }

        // Step 2: allow-listed tables
        if mode.includes_tables() {
            let entries = self.effective_entries(requested, &mut skipped);
            if !entries.is_empty() {
                let mut schemas: Vec<String> =
                    entries.iter().map(|e| e.schema().to_string()).collect();
                schemas.sort();
                schemas.dedup();

                let tables =
                    SchemaInspector::tables_in_schemas(self.backend.as_ref(), &schemas).await?;
                for entry in &entries {
                    let matched: Vec<_> = tables.iter().filter(|t| entry.matches(t)).collect();
                    if matched.is_empty() {
                        skip(&mut skipped, entry.to_string(), "no matching table");
                    }
                    found.extend(matched.into_iter().cloned());
                }
            }
        }

        // Step 3: catalog fallback
        let mut fallback = false;
        if found.is_empty() {
            let kinds: Vec<RelationKind> = self
                .policy
                .included_kinds
                .iter()
                .copied()
                .filter(|k| mode.includes(*k))
                .collect();
            if !kinds.is_empty() {
                let objects = SchemaInspector::user_objects(
                    self.backend.as_ref(),
                    &self.policy.excluded_schemas,
                    &kinds,
                )
                .await?;
                fallback = true;
                found.extend(objects.into_iter().filter(|o| {
                    !self
                        .policy
                        .excluded_schemas
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(&o.schema))
                }));
            }
        }

        let relations: Vec<RelationDescriptor> = found.into_iter().collect();
        info!(
            mode = ?mode,
            count = relations.len(),
            fallback,
            skipped = skipped.len(),
            "Resolved relations"
        );
        Ok(ResolvedRelations {
            relations,
            fallback,
            skipped,
        })
    }

    /// Caller entries when given (narrowed to the server list), else the server list.
    fn effective_entries(&self, requested: &[String], skipped: &mut Vec<String>) -> Vec<AllowEntry> {
        let requested: Vec<&String> = requested.iter().filter(|r| !r.trim().is_empty()).collect();
        if requested.is_empty() {
            return self.server_entries.clone();
        }

        let mut entries = Vec::new();
        for raw in requested {
            match AllowEntry::parse(raw) {
                Ok(entry) => {
                    if self.server_entries.is_empty()
                        || self.server_entries.iter().any(|s| s.covers(&entry))
                    {
                        entries.push(entry);
                    } else {
                        skip(skipped, raw.trim().to_string(), "not covered by the server allow-list");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Skipping allow-list entry");
                    skipped.push(e.to_string());
                }
            }
        }
        entries
    }
}

fn skip(skipped: &mut Vec<String>, entry: String, reason: &str) {
    let err = GatewayError::resolution(entry, reason);
    warn!(error = %err, "Skipping allow-list entry");
    skipped.push(err.to_string());
}
