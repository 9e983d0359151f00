//! Plan validation error types
//!
//! Error codes:
//! - PLAN_INVALID_JSON
//! - PLAN_NOT_AN_OBJECT
//! - PLAN_UNKNOWN_ACTION
//! - PLAN_MISSING_FIELD
//! - PLAN_TYPE_MISMATCH
//! - PLAN_OUT_OF_RANGE
//! - PLAN_INVALID_VALUE
//!
//! All plan errors are terminal: a candidate is either accepted whole or
//! rejected, never partially accepted.

use std::fmt;

use serde_json::Value;

/// Plan validation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Candidate text is not parseable JSON
    InvalidJson,
    /// Candidate is not a JSON object
    NotAnObject,
    /// `action` is not one of the six supported actions
    UnknownAction,
    /// Required field is absent
    MissingField,
    /// Field has the wrong JSON type
    TypeMismatch,
    /// Numeric or length constraint violated
    OutOfRange,
    /// Field value is outside its allowed set
    InvalidValue,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::InvalidJson => "PLAN_INVALID_JSON",
            SchemaErrorCode::NotAnObject => "PLAN_NOT_AN_OBJECT",
            SchemaErrorCode::UnknownAction => "PLAN_UNKNOWN_ACTION",
            SchemaErrorCode::MissingField => "PLAN_MISSING_FIELD",
            SchemaErrorCode::TypeMismatch => "PLAN_TYPE_MISMATCH",
            SchemaErrorCode::OutOfRange => "PLAN_OUT_OF_RANGE",
            SchemaErrorCode::InvalidValue => "PLAN_INVALID_VALUE",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A candidate plan failed structural or range validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValidationError {
    code: SchemaErrorCode,
    field: Option<String>,
    message: String,
}

impl SchemaValidationError {
    fn new(code: SchemaErrorCode, field: Option<String>, message: String) -> Self {
        Self {
            code,
            field,
            message,
        }
    }

    /// Candidate text could not be parsed as JSON
    pub fn invalid_json(reason: impl fmt::Display) -> Self {
        Self::new(
            SchemaErrorCode::InvalidJson,
            None,
            format!("Invalid JSON from LLM: {}", reason),
        )
    }

    /// Candidate is not an object
    pub fn not_an_object(found: &Value) -> Self {
        Self::new(
            SchemaErrorCode::NotAnObject,
            None,
            format!("plan must be an object, found {}", json_type_name(found)),
        )
    }

    /// Unknown action discriminator
    pub fn unknown_action(action: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownAction,
            Some("action".into()),
            format!(
                "action must be one of find, count, distinct, aggregate, update, delete (got '{}')",
                action
            ),
        )
    }

    /// Required field absent
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            SchemaErrorCode::MissingField,
            Some(field.clone()),
            format!("{} is required", field),
        )
    }

    /// Field present with the wrong JSON type
    pub fn type_mismatch(field: impl Into<String>, expected: &str, found: &Value) -> Self {
        let field = field.into();
        let message = format!(
            "{} must be {}, found {}",
            field,
            expected,
            json_type_name(found)
        );
        Self::new(SchemaErrorCode::TypeMismatch, Some(field), message)
    }

    /// Numeric or length range violated; `constraint` reads like "≤ 1000"
    pub fn out_of_range(field: impl Into<String>, constraint: impl fmt::Display) -> Self {
        let field = field.into();
        let message = format!("{} must be {}", field, constraint);
        Self::new(SchemaErrorCode::OutOfRange, Some(field), message)
    }

    /// Value outside its allowed set
    pub fn invalid_value(field: impl Into<String>, expectation: impl fmt::Display) -> Self {
        let field = field.into();
        let message = format!("{} must be {}", field, expectation);
        Self::new(SchemaErrorCode::InvalidValue, Some(field), message)
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the offending field, if one is known
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the human-readable constraint message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for SchemaValidationError {}

/// Result type for plan validation
pub type PlanResult<T> = Result<T, SchemaValidationError>;

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
