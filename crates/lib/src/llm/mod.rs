//! LLM abstraction and OpenAI-compatible client.
//!
//! The agent talks to a [`LlmBackend`]; [`OpenAiClient`] is the production implementation
//! (chat completions with function calling).

mod openai;
mod types;

pub use openai::OpenAiClient;
pub use types::{
    ChatMessage, ChatResponse, LlmBackend, LlmError, ToolCall, ToolCallFunction, ToolDefinition,
    ToolFunctionDefinition,
};
