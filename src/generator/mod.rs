//! Plan generation via an upstream language model
//!
//! The generator owns the prompt contract with the model and the parsing of
//! its reply. Its output is always a normalized `Plan`; safety validation is
//! left to the caller so it runs immediately before execution.

mod client;
mod errors;
mod generator;
mod prompt;

pub use client::{
    ChatCompletion, HttpChatClient, LlmEndpoint, DEFAULT_LLM_MODEL, DEFAULT_LLM_URL,
    LLM_MODEL_ENV, LLM_URL_ENV,
};
pub use errors::{GenerateError, GenerateResult, UpstreamError};
pub use generator::PlanGenerator;
pub use prompt::{build_request, response_format, system_prompt, user_prompt, ChatMessage, ChatRequest};
