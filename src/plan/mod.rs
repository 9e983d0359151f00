//! Plan model for docpilot
//!
//! A plan is the typed form of one database operation proposed by the
//! upstream model (or handed back by a caller for confirmation).
//!
//! # Variants
//!
//! find, count, distinct, aggregate, update, delete. Each names exactly one
//! collection.
//!
//! # Construction
//!
//! Plans are only built by [`normalize`], which validates every field and
//! fills defaults once. A plan never changes after that.

mod errors;
mod extract;
mod model;
mod normalize;
mod schema;

pub use errors::{PlanResult, SchemaErrorCode, SchemaValidationError};
pub use extract::{candidate_text, extract_first_json_object};
pub use model::{
    Action, AggregatePlan, CountPlan, DeletePlan, DistinctPlan, Document, FindPlan, Plan,
    SortDirection, UpdatePlan,
};
pub use normalize::{
    normalize, DEFAULT_DELETE_LIMIT, DEFAULT_FIND_LIMIT, MAX_PIPELINE_STAGES, MAX_RESULT_LIMIT,
};
pub use schema::{CollectionSummary, SchemaSummary, MAX_SUMMARY_FIELDS};

pub(crate) use errors::json_type_name;
