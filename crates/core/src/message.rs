//! Message and Conversation domain types.
//!
//! A [`Conversation`] is the append-only message log for one agent. Its
//! insertion order is the wire order sent to the model on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::tool::ToolCall;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// The reply to one tool call, correlated by `call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    User {
        content: String,
    },
    /// `content` is `None` for a turn that produced only tool calls (or nothing).
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult(ToolResultMessage),
}

impl Message {
    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::ToolResult(_) => Role::Tool,
        }
    }

    /// Convert into the OpenAI-compatible wire shape.
    pub fn to_wire(&self) -> WireMessage {
        match self {
            Self::User { content } => WireMessage::new(Role::User, Some(content.clone())),
            Self::Assistant {
                content,
                tool_calls,
            } => WireMessage {
                tool_calls: tool_calls.iter().map(WireToolCall::from).collect(),
                ..WireMessage::new(Role::Assistant, content.clone())
            },
            Self::ToolResult(result) => WireMessage {
                tool_call_id: Some(result.call_id.clone()),
                ..WireMessage::new(Role::Tool, Some(result.content.clone()))
            },
        }
    }
}

/// A message as sent in the `messages` array of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,

    /// Serialized as `null` when absent.
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    fn new(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A tool call as it appears on the wire, with arguments as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_type() -> String {
    "function".into()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.call_id.clone(),
            kind: function_type(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: serde_json::Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }
}

/// The ordered message log of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    /// Emitted ahead of every other message when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    messages: Vec<Message>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            system_prompt: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::User {
            content: content.into(),
        });
    }

    /// Record an assistant turn. `None` still records a placeholder turn.
    pub fn add_assistant_message(&mut self, content: Option<String>) {
        self.add_assistant_message_with_tool_calls(content, Vec::new());
    }

    /// Record an assistant turn together with the tool calls it issued.
    pub fn add_assistant_message_with_tool_calls(
        &mut self,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        let content = content.filter(|c| !c.is_empty());
        self.push(Message::Assistant {
            content,
            tool_calls,
        });
    }

    pub fn add_tool_result_message(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.add_tool_result(ToolResultMessage {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        });
    }

    /// Append a tool result. Results for calls no assistant turn issued are
    /// still recorded, but flagged in the log.
    pub fn add_tool_result(&mut self, result: ToolResultMessage) {
        if !self.has_issued_call(&result.call_id) {
            warn!(
                conversation_id = %self.id,
                call_id = %result.call_id,
                "Tool result does not match any issued tool call"
            );
        }
        self.push(Message::ToolResult(result));
    }

    /// Snapshot of the log in wire order, system prompt first.
    pub fn get_messages(&self) -> Vec<WireMessage> {
        let system = self
            .system_prompt
            .as_ref()
            .map(|p| WireMessage::new(Role::System, Some(p.clone())));
        system
            .into_iter()
            .chain(self.messages.iter().map(Message::to_wire))
            .collect()
    }

    /// The raw log.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    fn has_issued_call(&self, call_id: &str) -> bool {
        self.messages.iter().rev().any(|m| match m {
            Message::Assistant { tool_calls, .. } => tool_calls.iter().any(|c| c.call_id == call_id),
            _ => false,
        })
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
