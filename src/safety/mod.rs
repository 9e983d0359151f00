//! Safety validation for docpilot plans
//!
//! Runs after normalization and immediately before execution. A plan that
//! reaches the executor has passed this check in the same request, however
//! many times it was generated or handed back.
//!
//! # Forbidden sets
//!
//! - filter keys: `$where`
//! - pipeline stages: `$out`, `$merge`
//! - pipeline and update operators: `$where`, `$function`, `$accumulator`

mod errors;
mod validator;

pub use errors::{SafetyResult, SafetyViolation, SafetyViolationCode};
pub use validator::{
    check, SafetyValidator, ScanLimits, FORBIDDEN_FILTER_KEYS, FORBIDDEN_PIPELINE_OPERATORS,
    FORBIDDEN_PIPELINE_STAGES, FORBIDDEN_UPDATE_OPERATORS,
};
