//! Backend-neutral chat types shared by the agent and the HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("llm response malformed: {0}")]
    Malformed(String),
    #[error("llm response has no message content")]
    MissingContent,
}

/// Chat completion backend. Tools are offered only when `tools` is Some; the model picks whether to call one.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse, LlmError>;
}

/// One tool/function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque id assigned by the model; echoed back as `tool_call_id` on the result.
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub typ: String,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Raw JSON arguments string as sent by the model.
    #[serde(default)]
    pub arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// One role-tagged entry of a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// When role is "tool", the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// When role is "tool", the name of the tool this result is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    /// Assistant message that only carries tool calls (no text).
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call.id.clone()),
            name: Some(call.function.name.clone()),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// Tool definition for chat (function-calling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub typ: String,
    pub function: ToolFunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

/// Assistant message of the first choice.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Text content of the assistant message, if the backend sent one.
    pub fn content(&self) -> Option<&str> {
        self.message.content.as_deref()
    }

    /// Tool calls requested by the model; empty when it answered directly.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_echoes_call_id_and_name() {
        let call = ToolCall {
            id: "call_abc".to_string(),
            typ: "function".to_string(),
            function: ToolCallFunction {
                name: "get_ubicacion".to_string(),
                arguments: "{}".to_string(),
            },
        };
        let msg = ChatMessage::tool_result(&call, "\"Av. Los Leones\"");
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_abc"));
        assert_eq!(msg.name.as_deref(), Some("get_ubicacion"));
    }

    #[test]
    fn response_without_tool_calls_has_empty_slice() {
        let res = ChatResponse {
            message: ChatMessage {
                role: "assistant".to_string(),
                content: Some("hola".to_string()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            },
        };
        assert!(res.tool_calls().is_empty());
        assert_eq!(res.content(), Some("hola"));
    }
}
