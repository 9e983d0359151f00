//! Safety violation types
//!
//! Error codes:
//! - SAFETY_INVALID_COLLECTION
//! - SAFETY_MISSING_FIELD
//! - SAFETY_FORBIDDEN_FILTER_KEY
//! - SAFETY_FORBIDDEN_STAGE
//! - SAFETY_FORBIDDEN_OPERATOR
//! - SAFETY_EMPTY_STAGE
//! - SAFETY_LIMIT_TOO_LARGE
//! - SAFETY_TOO_DEEP
//! - SAFETY_TOO_LARGE
//!
//! A violation is terminal: the plan is never executed and never retried.

use std::fmt;

/// Safety violation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyViolationCode {
    /// Collection name is blank
    InvalidCollection,
    /// Distinct field is blank
    MissingField,
    /// Filter uses a forbidden key such as `$where`
    ForbiddenFilterKey,
    /// Pipeline uses a forbidden stage such as `$out`
    ForbiddenStage,
    /// Pipeline or update uses a forbidden operator such as `$function`
    ForbiddenOperator,
    /// Pipeline stage has no keys
    EmptyStage,
    /// Limit above the hard ceiling
    LimitTooLarge,
    /// Document nesting exceeds the scan depth bound
    TooDeep,
    /// Document exceeds the scan node budget
    TooLarge,
}

impl SafetyViolationCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SafetyViolationCode::InvalidCollection => "SAFETY_INVALID_COLLECTION",
            SafetyViolationCode::MissingField => "SAFETY_MISSING_FIELD",
            SafetyViolationCode::ForbiddenFilterKey => "SAFETY_FORBIDDEN_FILTER_KEY",
            SafetyViolationCode::ForbiddenStage => "SAFETY_FORBIDDEN_STAGE",
            SafetyViolationCode::ForbiddenOperator => "SAFETY_FORBIDDEN_OPERATOR",
            SafetyViolationCode::EmptyStage => "SAFETY_EMPTY_STAGE",
            SafetyViolationCode::LimitTooLarge => "SAFETY_LIMIT_TOO_LARGE",
            SafetyViolationCode::TooDeep => "SAFETY_TOO_DEEP",
            SafetyViolationCode::TooLarge => "SAFETY_TOO_LARGE",
        }
    }
}

impl fmt::Display for SafetyViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A structurally valid plan contains a forbidden construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyViolation {
    code: SafetyViolationCode,
    message: String,
    /// Offending key, for forbidden-token violations
    key: Option<String>,
}

impl SafetyViolation {
    fn new(code: SafetyViolationCode, message: String, key: Option<String>) -> Self {
        Self { code, message, key }
    }

    pub fn invalid_collection() -> Self {
        Self::new(
            SafetyViolationCode::InvalidCollection,
            "Invalid collection".into(),
            None,
        )
    }

    pub fn distinct_field_required() -> Self {
        Self::new(
            SafetyViolationCode::MissingField,
            "Distinct field required".into(),
            None,
        )
    }

    /// `context` names the scanned tree, e.g. "filter" or "pipeline[2]"
    pub fn forbidden_filter_key(context: &str, key: &str) -> Self {
        Self::new(
            SafetyViolationCode::ForbiddenFilterKey,
            format!("{} contains forbidden key '{}'", context, key),
            Some(key.to_string()),
        )
    }

    pub fn forbidden_stage(index: usize, stage: &str) -> Self {
        Self::new(
            SafetyViolationCode::ForbiddenStage,
            format!("Forbidden stage '{}' at pipeline[{}]", stage, index),
            Some(stage.to_string()),
        )
    }

    pub fn forbidden_operator(context: &str, operator: &str) -> Self {
        Self::new(
            SafetyViolationCode::ForbiddenOperator,
            format!("{} contains forbidden operator '{}'", context, operator),
            Some(operator.to_string()),
        )
    }

    pub fn empty_stage(index: usize) -> Self {
        Self::new(
            SafetyViolationCode::EmptyStage,
            format!("Empty pipeline stage at pipeline[{}]", index),
            None,
        )
    }

    pub fn limit_too_large(limit: u64, max: u64) -> Self {
        Self::new(
            SafetyViolationCode::LimitTooLarge,
            format!("Limit {} exceeds maximum {}", limit, max),
            None,
        )
    }

    pub fn too_deep(context: &str, max_depth: usize) -> Self {
        Self::new(
            SafetyViolationCode::TooDeep,
            format!("{} is nested deeper than {} levels", context, max_depth),
            None,
        )
    }

    pub fn too_large(context: &str, max_nodes: usize) -> Self {
        Self::new(
            SafetyViolationCode::TooLarge,
            format!("{} has more than {} nodes", context, max_nodes),
            None,
        )
    }

    pub fn code(&self) -> SafetyViolationCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for SafetyViolation {}

/// Result type for safety checks
pub type SafetyResult<T> = Result<T, SafetyViolation>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code_and_key() {
        let v = SafetyViolation::forbidden_stage(1, "$out");
        assert_eq!(v.code(), SafetyViolationCode::ForbiddenStage);
        assert_eq!(v.key(), Some("$out"));
        let display = v.to_string();
        assert!(display.contains("SAFETY_FORBIDDEN_STAGE"));
        assert!(display.contains("pipeline[1]"));
    }
}
