//! In-process document store
//!
//! Databases hold named collections of JSON documents. Collections are
//! listed in name order and documents keep insertion order. Documents
//! without an `_id` get a UUID string on insert.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::aggregate::run_pipeline;
use super::document::{lookup_path, project};
use super::errors::{StoreError, StoreResult};
use super::filters::FilterMatcher;
use super::sorter::sort_documents;
use super::store::{DocumentStore, FindOptions, UpdateOutcome};
use super::update::{apply_update, upsert_seed, validate_update};
use crate::plan::Document;

type Collections = BTreeMap<String, Vec<Document>>;

/// `DocumentStore` backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{collection: [documents]}` from a JSON file into `db`
    pub fn from_seed_file(db: &str, path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let seed_error = |reason: String| StoreError::Seed {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))?;

        let store = Self::new();
        store.seed(db, &value).map_err(|e| seed_error(e.to_string()))?;
        Ok(store)
    }

    /// Inserts every collection of a `{collection: [documents]}` value
    pub fn seed(&self, db: &str, value: &Value) -> StoreResult<()> {
        let collections = value
            .as_object()
            .ok_or_else(|| StoreError::invalid("seed data must be an object of collections"))?;
        for (name, documents) in collections {
            let documents = documents
                .as_array()
                .ok_or_else(|| {
                    StoreError::invalid(format!("collection '{}' must be an array", name))
                })?
                .iter()
                .map(|doc| {
                    doc.as_object().cloned().ok_or_else(|| {
                        StoreError::invalid(format!(
                            "collection '{}' must contain only objects",
                            name
                        ))
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            self.insert_many(db, name, documents);
        }
        Ok(())
    }

    /// Appends documents, assigning `_id` where missing. Creates the collection.
    pub fn insert_many(&self, db: &str, collection: &str, documents: Vec<Document>) {
        let mut databases = self.databases.write();
        let target = databases
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        for mut doc in documents {
            ensure_id(&mut doc);
            target.push(doc);
        }
    }

    /// Snapshot of a collection's documents
    pub fn documents(&self, db: &str, collection: &str) -> Vec<Document> {
        self.databases
            .read()
            .get(db)
            .and_then(|c| c.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    fn matching(&self, db: &str, collection: &str, filter: &Document) -> StoreResult<Vec<Document>> {
        let databases = self.databases.read();
        let Some(documents) = databases.get(db).and_then(|c| c.get(collection)) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for doc in documents {
            if FilterMatcher::matches(doc, filter)? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }
}

fn ensure_id(doc: &mut Document) {
    if !doc.contains_key("_id") {
        doc.insert("_id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut documents = self.matching(db, collection, filter)?;
        if let Some(sort) = &options.sort {
            sort_documents(&mut documents, sort);
        }

        let skip = options.skip as usize;
        let limit = match options.limit {
            0 => usize::MAX,
            n => n as usize,
        };
        let page = documents.into_iter().skip(skip).take(limit);

        match &options.projection {
            Some(projection) => page.map(|doc| project(&doc, projection)).collect(),
            None => Ok(page.collect()),
        }
    }

    async fn count(&self, db: &str, collection: &str, filter: &Document) -> StoreResult<u64> {
        Ok(self.matching(db, collection, filter)?.len() as u64)
    }

    async fn distinct(
        &self,
        db: &str,
        collection: &str,
        field: &str,
        filter: &Document,
    ) -> StoreResult<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        let mut push = |value: &Value| {
            if !values.contains(value) {
                values.push(value.clone());
            }
        };
        for doc in self.matching(db, collection, filter)? {
            match lookup_path(&doc, field) {
                Some(Value::Array(items)) => items.iter().for_each(&mut push),
                Some(value) => push(value),
                None => {}
            }
        }
        Ok(values)
    }

    async fn aggregate(
        &self,
        db: &str,
        collection: &str,
        pipeline: &[Document],
        _allow_disk_use: bool,
    ) -> StoreResult<Vec<Document>> {
        run_pipeline(self.documents(db, collection), pipeline)
    }

    async fn update_many(
        &self,
        db: &str,
        collection: &str,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        validate_update(update)?;

        let mut databases = self.databases.write();
        let documents = databases
            .entry(db.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        // Compute every new version first so a failing update leaves the
        // collection untouched.
        let mut staged = Vec::new();
        for (index, doc) in documents.iter().enumerate() {
            if FilterMatcher::matches(doc, filter)? {
                let mut next = doc.clone();
                let changed = apply_update(&mut next, update)?;
                staged.push((index, next, changed));
            }
        }

        let mut outcome = UpdateOutcome {
            matched: staged.len() as u64,
            ..UpdateOutcome::default()
        };

        if staged.is_empty() && upsert {
            let mut seed = upsert_seed(filter)?;
            apply_update(&mut seed, update)?;
            ensure_id(&mut seed);
            outcome.upserted = 1;
            outcome.upserted_id = seed.get("_id").cloned();
            documents.push(seed);
            return Ok(outcome);
        }

        for (index, next, changed) in staged {
            if changed {
                outcome.modified += 1;
                documents[index] = next;
            }
        }
        Ok(outcome)
    }

    async fn delete_many(
        &self,
        db: &str,
        collection: &str,
        filter: &Document,
    ) -> StoreResult<u64> {
        let mut databases = self.databases.write();
        let Some(documents) = databases.get_mut(db).and_then(|c| c.get_mut(collection)) else {
            return Ok(0);
        };

        let keep = documents
            .iter()
            .map(|doc| FilterMatcher::matches(doc, filter).map(|m| !m))
            .collect::<StoreResult<Vec<bool>>>()?;
        let before = documents.len();
        let mut flags = keep.into_iter();
        documents.retain(|_| flags.next().unwrap_or(true));
        Ok((before - documents.len()) as u64)
    }

    async fn list_collections(&self, db: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .databases
            .read()
            .get(db)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn sample(&self, db: &str, collection: &str, size: usize) -> StoreResult<Vec<Document>> {
        let mut documents = self.documents(db, collection);
        documents.truncate(size);
        Ok(documents)
    }
}
