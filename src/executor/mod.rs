//! Plan execution for docpilot
//!
//! The dispatcher consumes validated plans and produces `{rows, meta}`.
//!
//! # Execution Flow (strict order)
//!
//! 1. Dispatch once on the plan's action
//! 2. Issue exactly one `DocumentStore` call, bounded by a timeout
//! 3. Shape rows and metadata for the action
//!
//! # Stores
//!
//! `DocumentStore` is the database seam. `MemoryStore` implements it in
//! process with filter, update and aggregation evaluation over JSON
//! documents.

mod aggregate;
mod discovery;
mod dispatcher;
mod document;
mod errors;
mod filters;
mod memory;
mod result;
mod sorter;
mod store;
mod update;

pub use aggregate::run_pipeline;
pub use discovery::{discover_schema, SCHEMA_SAMPLE_SIZE};
pub use dispatcher::{ExecutionDispatcher, DEFAULT_EXECUTION_TIMEOUT};
pub use document::{lookup_path, project};
pub use errors::{ExecutionError, ExecutorResult, StoreError, StoreResult};
pub use filters::FilterMatcher;
pub use memory::MemoryStore;
pub use result::{ExecutionMeta, ExecutionResult};
pub use sorter::{compare_values, sort_documents};
pub use store::{DocumentStore, FindOptions, UpdateOutcome};
pub use update::{apply_update, upsert_seed};
