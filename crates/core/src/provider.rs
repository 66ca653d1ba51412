//! The chat transport seam and OpenAI-compatible wire types.
//!
//! A [`ChatTransport`] knows how to put one request on the wire and hand
//! back either a channel of parsed response chunks (streaming) or a whole
//! completion. Retry, decoding and event production live above it in the
//! chat client, so tests can drive the client with a scripted transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::event::TokenUsage;
use crate::message::{WireMessage, WireToolCall};

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema for the arguments; `None` means "no parameters declared".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    /// The `{type: "function", function: {...}}` entry of the `tools` array.
    pub fn to_api_tool(&self) -> Value {
        let parameters = self.parameters.clone().unwrap_or_else(|| {
            json!({
                "type": "object",
                "properties": {},
                "required": [],
            })
        });
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": parameters,
            }
        })
    }
}

/// One chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The model to use (e.g., "mistralai/devstral-2512:free")
    pub model: String,

    /// Conversation snapshot in wire order
    pub messages: Vec<WireMessage>,

    /// Available tools; omitted from the payload entirely when `None` or empty
    pub tools: Option<Vec<ToolDefinition>>,

    pub stream: bool,
}

impl ChatRequest {
    /// Build the provider payload.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
            "stream": self.stream,
        });

        if self.stream {
            body["stream_options"] = json!({ "include_usage": true });
        }

        if let Some(tools) = self.tools.as_ref().filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(tools.iter().map(ToolDefinition::to_api_tool).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

// --- Streaming chunk types ---

/// A single `data: {...}` chunk of a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A tool call fragment; arrives incrementally across chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u32>,
}

impl From<ApiUsage> for TokenUsage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            cached_tokens: u
                .prompt_tokens_details
                .and_then(|d| d.cached_tokens)
                .unwrap_or(0),
        }
    }
}

// --- Non-streaming response types ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Receiving end of a streamed response. The sender closes it after the
/// last chunk; a mid-stream failure arrives as an `Err` item.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<ChatChunk, ProviderError>>;

/// The wire-level seam under the chat client.
///
/// Implementations: the OpenAI-compatible HTTP transport; scripted
/// transports in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// A human-readable name for this endpoint (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Open a streaming request.
    async fn stream(&self, request: &ChatRequest) -> std::result::Result<ChunkReceiver, ProviderError>;

    /// Perform a single non-streaming round-trip.
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<ChatCompletion, ProviderError>;
}
