//! # Relay Core
//!
//! Domain types, traits, and error definitions for the relay agent.
//! This crate has **no network dependencies**; it defines the domain model
//! that the provider, tool, and agent crates implement against.
//!
//! ## Layout
//!
//! - [`event`]: streaming protocol events and agent lifecycle events
//! - [`message`]: conversation messages and the ordered conversation log
//! - [`provider`]: the chat transport seam and OpenAI-compatible wire types
//! - [`tool`] / [`registry`]: the tool capability contract and name-based dispatch
//! - [`schema`]: declarative parameter schemas and their validator

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use event::{AgentEvent, StreamEvent, TokenUsage};
pub use message::{Conversation, ConversationId, Message, Role, ToolResultMessage, WireMessage};
pub use provider::{ChatRequest, ChatTransport, ToolDefinition};
pub use registry::ToolRegistry;
pub use schema::{ParamField, ParamSchema, ParamType, ToolSchema};
pub use tool::{Tool, ToolCall, ToolConfirmation, ToolInvocation, ToolKind, ToolResult};
