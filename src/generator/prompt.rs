//! Upstream prompt and request contract
//!
//! The system instruction lists the allowed actions, the forbidden stages
//! and operators, the result ceiling, and one literal example per variant.
//! The response format is a JSON schema with the same shape as the plan
//! contract. The upstream is told to follow it but is not trusted to.

use serde::Serialize;
use serde_json::{json, Value};

use crate::plan::{SchemaSummary, DEFAULT_FIND_LIMIT, MAX_RESULT_LIMIT};

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat-completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub response_format: Value,
}

/// Builds the full request for one question
pub fn build_request(question: &str, schema: &SchemaSummary, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system_prompt()),
            ChatMessage::user(user_prompt(question, schema)),
        ],
        temperature: 0.0,
        response_format: response_format(),
    }
}

pub fn system_prompt() -> String {
    let limit_rule = format!(
        "- Limit results to <= {} unless the user requests a larger number (max {}).",
        DEFAULT_FIND_LIMIT, MAX_RESULT_LIMIT
    );
    [
        "You are a MongoDB query planner.",
        "Return ONLY strict JSON with no markdown, no prose.",
        "Schema is provided; choose the most relevant collection.",
        "Allowed actions: find, aggregate, count, distinct, update, delete.",
        "Constraints:",
        "- For aggregate, forbid $out and $merge stages.",
        "- Never use $where, $function, or $accumulator.",
        limit_rule.as_str(),
        "JSON shape examples:",
        r#"{ "action": "find", "collection": "users", "filter": { "status": "active" }, "projection": { "email": 1 }, "sort": { "createdAt": -1 }, "limit": 50, "skip": 0 }"#,
        r#"{ "action": "count", "collection": "orders", "filter": { "status": "pending" } }"#,
        r#"{ "action": "distinct", "collection": "orders", "field": "status", "filter": {} }"#,
        r#"{ "action": "aggregate", "collection": "orders", "pipeline": [ { "$match": { "status": "shipped" } }, { "$group": { "_id": "$userId", "total": { "$sum": "$total" } } }, { "$sort": { "total": -1 } }, { "$limit": 50 } ] }"#,
        r#"{ "action": "update", "collection": "users", "filter": { "status": "inactive" }, "update": { "$set": { "status": "active" } }, "multi": true }"#,
        r#"{ "action": "delete", "collection": "temp_data", "filter": { "expired": true }, "limit": 100 }"#,
    ]
    .join("\n")
}

pub fn user_prompt(question: &str, schema: &SchemaSummary) -> String {
    let schema_json = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".into());
    ["Question:", question, "", "Schema summary:", schema_json.as_str()].join("\n")
}

/// JSON-schema response format matching the plan contract
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "schema": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["find", "aggregate", "count", "distinct", "update", "delete"]
                    },
                    "collection": { "type": "string" },
                    "filter": { "type": "object" },
                    "projection": { "type": "object" },
                    "sort": { "type": "object" },
                    "limit": { "type": "number" },
                    "skip": { "type": "number" },
                    "pipeline": { "type": "array", "items": { "type": "object" } },
                    "allowDiskUse": { "type": "boolean" },
                    "field": { "type": "string" },
                    "update": { "type": "object" },
                    "upsert": { "type": "boolean" },
                    "multi": { "type": "boolean" }
                },
                "required": ["action", "collection"]
            }
        }
    })
}
