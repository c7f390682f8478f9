//! Reasoning backend integration
//!
//! The pipeline treats the backend as a black box behind [`LlmProvider`];
//! [`openai`] provides the concrete OpenAI-compatible chat-completions
//! client used in production.

pub mod openai;
pub mod provider;

pub use openai::{OpenAiCompatibleProvider, OpenAiConfig};
pub use provider::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, MessageRole, TokenUsage,
};
