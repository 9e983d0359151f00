//! docpilot - natural-language questions answered from a document store
//!
//! A question goes through a strict pipeline:
//!
//! 1. Rate-limit the session
//! 2. Ask a language model for a JSON plan, with the schema as context
//! 3. Normalize the plan into a typed variant
//! 4. Reject forbidden constructs
//! 5. Require explicit confirmation for update and delete
//! 6. Execute against the document store under a timeout

pub mod app;
pub mod cli;
pub mod config;
pub mod executor;
pub mod generator;
pub mod http_server;
pub mod observability;
pub mod pipeline;
pub mod plan;
pub mod ratelimit;
pub mod safety;
