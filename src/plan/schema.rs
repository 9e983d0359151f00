//! Schema summary handed to the plan generator as prompt context

use serde::{Deserialize, Serialize};

/// Maximum number of field names kept per collection
pub const MAX_SUMMARY_FIELDS: usize = 50;

/// One collection and a sample of its top-level field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    pub fields: Vec<String>,
}

impl CollectionSummary {
    /// Creates a summary, keeping at most `MAX_SUMMARY_FIELDS` field names
    pub fn new(name: impl Into<String>, mut fields: Vec<String>) -> Self {
        fields.truncate(MAX_SUMMARY_FIELDS);
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// Read-only snapshot of a database's collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub db_name: String,
    pub collections: Vec<CollectionSummary>,
}

impl SchemaSummary {
    pub fn new(db_name: impl Into<String>, collections: Vec<CollectionSummary>) -> Self {
        Self {
            db_name: db_name.into(),
            collections,
        }
    }

    /// Returns the summary for a named collection
    pub fn collection(&self, name: &str) -> Option<&CollectionSummary> {
        self.collections.iter().find(|c| c.name == name)
    }
}
