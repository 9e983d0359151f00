//! Plan safety validator
//!
//! Scans a normalized plan's filter, update and pipeline trees for forbidden
//! keys. Every key is checked, object values are recursed into, and arrays
//! are scanned element by element. The first violation wins.
//!
//! Trees come from an untrusted model, so the walk is bounded by nesting
//! depth and total node count. Exceeding either bound is a violation.

use serde_json::Value;

use crate::plan::{Document, Plan, MAX_RESULT_LIMIT};

use super::errors::{SafetyResult, SafetyViolation, SafetyViolationCode};

/// Keys rejected anywhere inside a filter
pub const FORBIDDEN_FILTER_KEYS: &[&str] = &["$where"];

/// Stage names rejected at the top level of a pipeline stage
pub const FORBIDDEN_PIPELINE_STAGES: &[&str] = &["$out", "$merge"];

/// Operators rejected anywhere inside a pipeline stage
pub const FORBIDDEN_PIPELINE_OPERATORS: &[&str] = &["$where", "$function", "$accumulator"];

/// Operators rejected anywhere inside an update document
pub const FORBIDDEN_UPDATE_OPERATORS: &[&str] = &["$where", "$function", "$accumulator"];

/// Bounds for one tree walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Deepest allowed nesting of objects and arrays
    pub max_depth: usize,
    /// Most keys plus array elements visited in one tree
    pub max_nodes: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 10_000,
        }
    }
}

/// Validates plans before they reach the executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyValidator {
    limits: ScanLimits,
}

impl SafetyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ScanLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    /// Checks a plan, returning the first violation found.
    pub fn check(&self, plan: &Plan) -> SafetyResult<()> {
        if plan.collection().trim().is_empty() {
            return Err(SafetyViolation::invalid_collection());
        }

        match plan {
            Plan::Find(find) => {
                self.scan_filter(find.filter())?;
                check_limit(find.limit())
            }
            Plan::Count(count) => self.scan_filter(count.filter()),
            Plan::Distinct(distinct) => {
                if distinct.field().trim().is_empty() {
                    return Err(SafetyViolation::distinct_field_required());
                }
                self.scan_filter(distinct.filter())
            }
            Plan::Aggregate(aggregate) => {
                for (index, stage) in aggregate.pipeline().iter().enumerate() {
                    self.check_stage(index, stage)?;
                }
                Ok(())
            }
            Plan::Update(update) => {
                self.scan_filter(update.filter())?;
                Scan::new(
                    FORBIDDEN_UPDATE_OPERATORS,
                    SafetyViolationCode::ForbiddenOperator,
                    "update",
                    self.limits,
                )
                .document(update.update(), 1)
            }
            Plan::Delete(delete) => {
                self.scan_filter(delete.filter())?;
                check_limit(delete.limit())
            }
        }
    }

    fn scan_filter(&self, filter: &Document) -> SafetyResult<()> {
        Scan::new(
            FORBIDDEN_FILTER_KEYS,
            SafetyViolationCode::ForbiddenFilterKey,
            "filter",
            self.limits,
        )
        .document(filter, 1)
    }

    fn check_stage(&self, index: usize, stage: &Document) -> SafetyResult<()> {
        if stage.is_empty() {
            return Err(SafetyViolation::empty_stage(index));
        }
        if let Some(name) = stage
            .keys()
            .find(|k| FORBIDDEN_PIPELINE_STAGES.contains(&k.as_str()))
        {
            return Err(SafetyViolation::forbidden_stage(index, name));
        }

        let context = format!("pipeline[{}]", index);
        Scan::new(
            FORBIDDEN_PIPELINE_OPERATORS,
            SafetyViolationCode::ForbiddenOperator,
            &context,
            self.limits,
        )
        .document(stage, 1)
    }
}

/// Checks a plan with the default scan limits.
pub fn check(plan: &Plan) -> SafetyResult<()> {
    SafetyValidator::default().check(plan)
}

fn check_limit(limit: u64) -> SafetyResult<()> {
    if limit > MAX_RESULT_LIMIT {
        return Err(SafetyViolation::limit_too_large(limit, MAX_RESULT_LIMIT));
    }
    Ok(())
}

/// Deep scan of one tree against one forbidden set
struct Scan<'a> {
    forbidden: &'a [&'a str],
    code: SafetyViolationCode,
    context: &'a str,
    limits: ScanLimits,
    nodes: usize,
}

impl<'a> Scan<'a> {
    fn new(
        forbidden: &'a [&'a str],
        code: SafetyViolationCode,
        context: &'a str,
        limits: ScanLimits,
    ) -> Self {
        Self {
            forbidden,
            code,
            context,
            limits,
            nodes: 0,
        }
    }

    fn document(mut self, doc: &Document, depth: usize) -> SafetyResult<()> {
        self.walk_document(doc, depth)
    }

    fn visit(&mut self, depth: usize) -> SafetyResult<()> {
        if depth > self.limits.max_depth {
            return Err(SafetyViolation::too_deep(self.context, self.limits.max_depth));
        }
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(SafetyViolation::too_large(self.context, self.limits.max_nodes));
        }
        Ok(())
    }

    fn walk_document(&mut self, doc: &Document, depth: usize) -> SafetyResult<()> {
        for (key, value) in doc {
            self.visit(depth)?;
            if self.forbidden.contains(&key.as_str()) {
                return Err(self.violation(key));
            }
            self.walk_value(value, depth + 1)?;
        }
        Ok(())
    }

    fn walk_value(&mut self, value: &Value, depth: usize) -> SafetyResult<()> {
        match value {
            Value::Object(doc) => self.walk_document(doc, depth),
            Value::Array(items) => {
                for item in items {
                    self.visit(depth)?;
                    self.walk_value(item, depth + 1)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn violation(&self, key: &str) -> SafetyViolation {
        match self.code {
            SafetyViolationCode::ForbiddenFilterKey => {
                SafetyViolation::forbidden_filter_key(self.context, key)
            }
            _ => SafetyViolation::forbidden_operator(self.context, key),
        }
    }
}
