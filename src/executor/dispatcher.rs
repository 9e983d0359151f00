//! Execution dispatcher
//!
//! Maps a validated plan to exactly one store call and shapes the result.
//! Execution flow (strict order):
//! 1. Start the wall clock
//! 2. Dispatch on the plan's action
//! 3. Bound the store call by the execution timeout
//! 4. Build rows and metadata
//!
//! No retries. The caller is responsible for safety validation and for the
//! confirmation of mutating plans.

use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::debug;

use super::errors::{ExecutionError, ExecutorResult, StoreResult};
use super::result::{ExecutionMeta, ExecutionResult};
use super::store::{DocumentStore, FindOptions};
use crate::plan::{Document, Plan};

/// Default bound on a single store call
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs plans against a `DocumentStore`
#[derive(Debug, Clone, Copy)]
pub struct ExecutionDispatcher {
    timeout: Duration,
}

impl Default for ExecutionDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTION_TIMEOUT)
    }
}

impl ExecutionDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `plan` against `db_name`.
    ///
    /// # Errors
    ///
    /// - `ExecutionError::Database` if the store fails, with its message
    /// - `ExecutionError::Timeout` if the store call outlives the timeout
    pub async fn run(
        &self,
        store: &dyn DocumentStore,
        db_name: &str,
        plan: &Plan,
    ) -> ExecutorResult<ExecutionResult> {
        let started = Instant::now();
        let collection = plan.collection();

        let (rows, count) = match plan {
            Plan::Find(find) => {
                let options = FindOptions {
                    projection: find.projection().cloned(),
                    sort: find.sort().cloned(),
                    skip: find.skip(),
                    limit: find.limit(),
                };
                let rows = self
                    .bounded(store.find(db_name, collection, find.filter(), &options))
                    .await?;
                let count = rows.len() as u64;
                (rows, Some(count))
            }
            Plan::Count(count) => {
                let n = self
                    .bounded(store.count(db_name, collection, count.filter()))
                    .await?;
                (vec![row("count", Value::from(n))], None)
            }
            Plan::Distinct(distinct) => {
                let values = self
                    .bounded(store.distinct(
                        db_name,
                        collection,
                        distinct.field(),
                        distinct.filter(),
                    ))
                    .await?;
                let rows: Vec<Document> =
                    values.into_iter().map(|value| row("value", value)).collect();
                let count = rows.len() as u64;
                (rows, Some(count))
            }
            Plan::Aggregate(aggregate) => {
                let rows = self
                    .bounded(store.aggregate(
                        db_name,
                        collection,
                        aggregate.pipeline(),
                        aggregate.allow_disk_use(),
                    ))
                    .await?;
                let count = rows.len() as u64;
                (rows, Some(count))
            }
            Plan::Update(update) => {
                let outcome = self
                    .bounded(store.update_many(
                        db_name,
                        collection,
                        update.filter(),
                        update.update(),
                        update.upsert(),
                    ))
                    .await?;
                let mut counts = Map::new();
                counts.insert("matchedCount".into(), Value::from(outcome.matched));
                counts.insert("modifiedCount".into(), Value::from(outcome.modified));
                counts.insert("upsertedCount".into(), Value::from(outcome.upserted));
                (vec![counts], None)
            }
            Plan::Delete(delete) => {
                let deleted = self
                    .bounded(store.delete_many(db_name, collection, delete.filter()))
                    .await?;
                (vec![row("deletedCount", Value::from(deleted))], None)
            }
        };

        let ms = started.elapsed().as_millis() as u64;
        debug!(
            action = %plan.action(),
            collection,
            rows = rows.len(),
            ms,
            "plan executed"
        );

        Ok(ExecutionResult {
            rows,
            meta: ExecutionMeta {
                action: plan.action(),
                count,
                ms,
            },
        })
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> ExecutorResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(ExecutionError::from),
            Err(_) => Err(ExecutionError::timeout(self.timeout)),
        }
    }
}

fn row(key: &str, value: Value) -> Document {
    let mut row = Map::new();
    row.insert(key.to_string(), value);
    row
}
