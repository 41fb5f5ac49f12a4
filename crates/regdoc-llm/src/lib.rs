//! regdoc-llm
//!
//! Generation client for OpenAI-compatible `/chat/completions` endpoints.

pub mod client;

pub use client::{chat_url, parse_completion, ChatClient};
