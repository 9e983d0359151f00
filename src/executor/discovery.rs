//! Schema discovery
//!
//! Builds the `SchemaSummary` handed to the plan generator by sampling a
//! few documents per collection.

use tracing::warn;

use super::errors::StoreResult;
use super::store::DocumentStore;
use crate::plan::{CollectionSummary, SchemaSummary};

/// Documents sampled per collection
pub const SCHEMA_SAMPLE_SIZE: usize = 5;

/// Lists the collections of `db_name` with their top-level field names.
///
/// Fields appear in first-seen order across the sample. A collection whose
/// sample fails is reported with no fields; failing to list collections is
/// an error.
pub async fn discover_schema(store: &dyn DocumentStore, db_name: &str) -> StoreResult<SchemaSummary> {
    let names = store.list_collections(db_name).await?;
    let mut collections = Vec::with_capacity(names.len());

    for name in names {
        let fields = match store.sample(db_name, &name, SCHEMA_SAMPLE_SIZE).await {
            Ok(documents) => {
                let mut fields: Vec<String> = Vec::new();
                for key in documents.iter().flat_map(|doc| doc.keys()) {
                    if !fields.contains(key) {
                        fields.push(key.clone());
                    }
                }
                fields
            }
            Err(err) => {
                warn!(collection = %name, error = %err, "schema sample failed");
                Vec::new()
            }
        };
        collections.push(CollectionSummary::new(name, fields));
    }

    Ok(SchemaSummary::new(db_name, collections))
}
