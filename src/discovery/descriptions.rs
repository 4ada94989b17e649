//! Human-written table and column descriptions.
//!
//! Loaded once at startup from an optional JSON file:
//!
//! ```json
//! {
//!   "tables": {
//!     "SalesLT.Customer": {
//!       "description": "One row per customer account",
//!       "columns": { "EmailAddress": "Primary contact address" }
//!     }
//!   }
//! }
//! ```
//!
//! Lookups are case-insensitive. Missing entries read as an empty description.

use crate::error::{GatewayError, GatewayResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
struct DescriptionFile {
    #[serde(default)]
    tables: HashMap<String, TableDescription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDescription {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct Descriptions {
    tables: HashMap<String, TableDescription>,
    source: Option<PathBuf>,
}

impl Descriptions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load descriptions from a JSON file.
    pub fn load(path: &Path) -> GatewayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::configuration(format!(
                "Cannot read descriptions file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut descriptions = Self::from_json_str(&text).map_err(|e| {
            GatewayError::configuration(format!(
                "Invalid descriptions file {}: {}",
                path.display(),
                e
            ))
        })?;
        descriptions.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            tables = descriptions.len(),
            "Loaded relation descriptions"
        );
        Ok(descriptions)
    }

    /// Parse descriptions from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let file: DescriptionFile = serde_json::from_str(json)?;
        let tables = file
            .tables
            .into_iter()
            .map(|(name, table)| {
                let columns = table
                    .columns
                    .into_iter()
                    .map(|(col, text)| (col.to_lowercase(), text))
                    .collect();
                (
                    name.to_lowercase(),
                    TableDescription {
                        description: table.description,
                        columns,
                    },
                )
            })
            .collect();
        Ok(Self {
            tables,
            source: None,
        })
    }

    /// Description of a relation by `schema.name`; empty when unknown.
    pub fn table(&self, qualified_name: &str) -> &str {
        self.tables
            .get(&qualified_name.to_lowercase())
            .map(|t| t.description.as_str())
            .unwrap_or("")
    }

    pub fn column(&self, qualified_name: &str, column: &str) -> Option<&str> {
        self.tables
            .get(&qualified_name.to_lowercase())
            .and_then(|t| t.columns.get(&column.to_lowercase()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// One-line provenance note for catalog output.
    pub fn source_note(&self) -> String {
        match &self.source {
            Some(path) => format!(
                "Descriptions loaded from {} ({} relations).",
                path.display(),
                self.len()
            ),
            None if self.is_empty() => "No description file configured.".to_string(),
            None => format!("Descriptions for {} relations.", self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "tables": {
            "SalesLT.Customer": {
                "description": "Customers",
                "columns": { "EmailAddress": "Contact e-mail" }
            },
            "dbo.vwUsers": { "description": "Active users" }
        }
    }"#;

    #[test]
    fn test_lookup_case_insensitive() {
        let d = Descriptions::from_json_str(SAMPLE).unwrap();
        assert_eq!(d.table("saleslt.customer"), "Customers");
        assert_eq!(d.table("SalesLT.Customer"), "Customers");
        assert_eq!(d.column("SalesLT.Customer", "emailaddress"), Some("Contact e-mail"));
    }

    #[test]
    fn test_missing_is_empty() {
        let d = Descriptions::from_json_str(SAMPLE).unwrap();
        assert_eq!(d.table("SalesLT.Product"), "");
        assert_eq!(d.column("dbo.vwUsers", "Id"), None);
        assert_eq!(Descriptions::empty().table("x.y"), "");
    }

    #[test]
    fn test_empty_document() {
        let d = Descriptions::from_json_str("{}").unwrap();
        assert!(d.is_empty());
        assert_eq!(d.source_note(), "No description file configured.");
    }

    #[test]
    fn test_invalid_json() {
        assert!(Descriptions::from_json_str("{\"tables\": [1]}").is_err());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = Descriptions::load(Path::new("/nonexistent/descriptions.json")).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
