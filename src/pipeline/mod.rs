//! Question-to-result pipeline
//!
//! Glue between the rate limiter, the plan generator, the safety validator
//! and the execution dispatcher, including the two-phase confirmation
//! protocol for mutating plans.

mod errors;
mod service;

pub use errors::{ErrorResponse, PipelineError, PipelineResult};
pub use service::{ExecuteRequest, PlannedQuery, QueryOutcome, QueryPipeline};
