//! refgraph-llm — Generative backend trait and concrete chat-completion clients.

pub mod backend;
pub mod json_extract;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use json_extract::extract_json;
