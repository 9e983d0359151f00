//! Result types for plan execution

use serde::Serialize;

use crate::plan::{Action, Document};

/// Execution metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionMeta {
    /// Action that produced the rows
    #[serde(rename = "type")]
    pub action: Action,
    /// Row count, reported for find, distinct and aggregate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Wall-clock milliseconds from the start of dispatch
    pub ms: u64,
}

/// Rows plus metadata for one execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub rows: Vec<Document>,
    pub meta: ExecutionMeta,
}

impl ExecutionResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
