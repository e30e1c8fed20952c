//! OpenAI-compatible chat completions client (`POST {base}/chat/completions`).
//!
//! Works against api.openai.com and any server speaking the same wire format.
//! When tools are offered the request carries `tool_choice: "auto"`.

use crate::llm::{
    ChatMessage, ChatResponse, LlmBackend, LlmError, ToolCall, ToolCallFunction, ToolDefinition,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// POST /chat/completions — non-streaming chat. Tools, when given, are offered with tool_choice "auto".
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let tools = tools.filter(|t| !t.is_empty());
        let body = OpenAiChatRequest {
            model: model.to_string(),
            messages: messages.iter().map(OpenAiMessage::from).collect(),
            tool_choice: tools.as_ref().map(|_| "auto"),
            tools: tools.map(tool_definitions_to_openai),
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: OpenAiChatResponse = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;
        openai_response_to_chat_response(data)
    }
}

#[async_trait]
impl LlmBackend for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse, LlmError> {
        self.chat_completion(model, &messages, tools).await
    }
}

// --- OpenAI wire types ---

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
enum OpenAiMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAiToolCallRef>>,
    },
    Tool {
        tool_call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        content: String,
    },
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(m: &ChatMessage) -> Self {
        let content = m.content.clone().unwrap_or_default();
        match m.role.as_str() {
            "system" => OpenAiMessage::System { content },
            "assistant" => OpenAiMessage::Assistant {
                content: m.content.clone(),
                tool_calls: m.tool_calls.as_ref().map(|tcs| {
                    tcs.iter()
                        .map(|tc| OpenAiToolCallRef {
                            id: tc.id.clone(),
                            typ: if tc.typ.is_empty() {
                                "function".to_string()
                            } else {
                                tc.typ.clone()
                            },
                            function: OpenAiToolCallFunctionRef {
                                name: tc.function.name.clone(),
                                arguments: if tc.function.arguments.is_empty() {
                                    "{}".to_string()
                                } else {
                                    tc.function.arguments.clone()
                                },
                            },
                        })
                        .collect()
                }),
            },
            "tool" => OpenAiMessage::Tool {
                tool_call_id: m.tool_call_id.clone().unwrap_or_default(),
                name: m.name.clone(),
                content,
            },
            _ => OpenAiMessage::User { content },
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiToolCallRef {
    id: String,
    #[serde(rename = "type")]
    typ: String,
    function: OpenAiToolCallFunctionRef,
}

#[derive(Debug, Serialize)]
struct OpenAiToolCallFunctionRef {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    typ: String,
    function: OpenAiToolFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiToolFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: serde_json::Value,
}

fn tool_definitions_to_openai(tools: Vec<ToolDefinition>) -> Vec<OpenAiTool> {
    tools
        .into_iter()
        .map(|t| OpenAiTool {
            typ: t.typ,
            function: OpenAiToolFunction {
                name: t.function.name,
                description: t.function.description,
                parameters: t.function.parameters,
            },
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Option<Vec<OpenAiChoice>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    role: Option<String>,
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseToolCall {
    id: Option<String>,
    #[serde(rename = "type")]
    typ: Option<String>,
    function: Option<OpenAiResponseToolCallFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseToolCallFunction {
    name: Option<String>,
    arguments: Option<String>,
}

fn openai_response_to_chat_response(data: OpenAiChatResponse) -> Result<ChatResponse, LlmError> {
    let message = data
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .ok_or_else(|| LlmError::Malformed("response has no choices[0].message".to_string()))?;
    // Calls without a function name cannot be dispatched; drop them.
    let tool_calls = message.tool_calls.map(|tcs| {
        tcs.into_iter()
            .filter_map(|tc| {
                let function = tc.function?;
                let name = function.name?;
                Some(ToolCall {
                    id: tc.id.unwrap_or_default(),
                    typ: tc.typ.unwrap_or_else(|| "function".to_string()),
                    function: ToolCallFunction {
                        name,
                        arguments: function.arguments.unwrap_or_default(),
                    },
                })
            })
            .collect::<Vec<_>>()
    });
    Ok(ChatResponse {
        message: ChatMessage {
            role: message.role.unwrap_or_else(|| "assistant".to_string()),
            content: message.content,
            tool_calls: tool_calls.filter(|t| !t.is_empty()),
            tool_call_id: None,
            name: None,
        },
    })
}
