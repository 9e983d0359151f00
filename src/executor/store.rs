//! Document store abstraction
//!
//! The dispatcher talks to the database only through this trait. A store
//! is shared behind `Arc` and must not hold locks across its own awaits.

use async_trait::async_trait;
use serde_json::Value;

use super::errors::StoreResult;
use crate::plan::Document;

/// Options for a `find` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: u64,
    /// Maximum rows; `0` means no limit
    pub limit: u64,
}

/// Counts reported by `update_many`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
    pub upserted_id: Option<Value>,
}

/// Connection to a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn count(&self, db: &str, collection: &str, filter: &Document) -> StoreResult<u64>;

    /// Distinct values of `field` among matching documents, in first-seen order
    async fn distinct(
        &self,
        db: &str,
        collection: &str,
        field: &str,
        filter: &Document,
    ) -> StoreResult<Vec<Value>>;

    async fn aggregate(
        &self,
        db: &str,
        collection: &str,
        pipeline: &[Document],
        allow_disk_use: bool,
    ) -> StoreResult<Vec<Document>>;

    /// Applies `update` to every match; inserts one document when nothing
    /// matches and `upsert` is set.
    async fn update_many(
        &self,
        db: &str,
        collection: &str,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;

    /// Deletes every match and returns the deleted count
    async fn delete_many(&self, db: &str, collection: &str, filter: &Document)
        -> StoreResult<u64>;

    async fn list_collections(&self, db: &str) -> StoreResult<Vec<String>>;

    /// Up to `size` documents from `collection`
    async fn sample(&self, db: &str, collection: &str, size: usize) -> StoreResult<Vec<Document>>;
}
