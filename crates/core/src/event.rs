//! Streaming and agent-level events.
//!
//! [`StreamEvent`] is what the chat client produces from the remote
//! endpoint's response. [`AgentEvent`] is what the agent surfaces to its
//! caller (a renderer, a gateway, a test) over the course of one turn.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tool::{ToolCall, ToolResult};

/// Token accounting reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub cached_tokens: u32,
}

/// One normalized unit of a model response.
///
/// A successful stream ends with exactly one `MessageComplete`; a failed
/// one ends with a single `Error` and no `MessageComplete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial text content.
    TextDelta { content: String },

    /// A fully assembled tool call.
    ToolCallComplete { call: ToolCall },

    /// End of a successful response. `text` carries the full content in
    /// non-streaming mode and is `None` when streaming.
    MessageComplete {
        finish_reason: Option<String>,
        usage: Option<TokenUsage>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// The request failed and will not be retried further.
    Error { message: String },
}

impl StreamEvent {
    pub fn text_delta(content: impl Into<String>) -> Self {
        Self::TextDelta {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Events emitted by the agent during one turn.
///
/// Every turn is bounded by exactly one `AgentStart` and one `AgentEnd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    AgentStart {
        message: String,
    },

    /// Partial text token from the LLM.
    TextDelta {
        content: String,
    },

    /// The full assistant text of the turn.
    TextComplete {
        content: String,
    },

    ToolCallStart {
        call_id: String,
        name: String,
        arguments: Map<String, Value>,
    },

    ToolCallComplete {
        call_id: String,
        name: String,
        result: ToolResult,
    },

    AgentError {
        error: String,
        #[serde(default)]
        details: Map<String, Value>,
    },

    /// `response` is the last `TextComplete` content of the turn, if any.
    AgentEnd {
        response: Option<String>,
    },
}

impl AgentEvent {
    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "agent_start",
            Self::TextDelta { .. } => "text_delta",
            Self::TextComplete { .. } => "text_complete",
            Self::ToolCallStart { .. } => "tool_call_start",
            Self::ToolCallComplete { .. } => "tool_call_complete",
            Self::AgentError { .. } => "agent_error",
            Self::AgentEnd { .. } => "agent_end",
        }
    }
}
