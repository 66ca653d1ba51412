//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! read files, run commands, call the network. Every tool is executed
//! through the [`ToolRegistry`](crate::registry::ToolRegistry), which
//! validates arguments first and normalizes every outcome into a
//! [`ToolResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema::ToolSchema;

/// Capability class of a tool, used for mutation classification and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Read,
    Write,
    Shell,
    Network,
    Memory,
    Mcp,
}

impl ToolKind {
    /// `read` and `mcp` are non-mutating; everything else may change state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Write | Self::Shell | Self::Network | Self::Memory)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Shell => "shell",
            Self::Network => "network",
            Self::Memory => "memory",
            Self::Mcp => "mcp",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request from the model to execute a tool.
///
/// Built only from fully assembled streamed tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub call_id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Decoded arguments
    pub arguments: Map<String, Value>,
}

/// Validated parameters plus the directory relative paths resolve against.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub params: Map<String, Value>,
    pub cwd: PathBuf,
}

/// A pending human-in-the-loop approval for a mutating tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfirmation {
    pub tool_name: String,
    pub params: Map<String, Value>,
    pub description: String,
}

/// The outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Error description when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Tool-specific structured details
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Whether `output` was cut to fit an output budget
    #[serde(default)]
    pub truncated: bool,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            metadata: Map::new(),
            truncated: false,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            metadata: Map::new(),
            truncated: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// The text handed back to the model as the tool message content.
    pub fn to_model_output(&self) -> String {
        if self.success {
            return self.output.clone();
        }

        let mut out = format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"));
        if !self.output.is_empty() {
            out.push_str("\n\nOutput:\n");
            out.push_str(&self.output);
        }
        out
    }
}

/// The core Tool trait.
///
/// Implementations hold only fixed configuration (size limits and the like);
/// nothing carries over between invocations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Capability class of this tool.
    fn kind(&self) -> ToolKind;

    /// Parameter declaration.
    fn schema(&self) -> ToolSchema;

    /// Human-readable validation errors; empty means the params are acceptable.
    fn validate(&self, params: &Map<String, Value>) -> Vec<String> {
        self.schema().validate(params)
    }

    /// Whether running with `params` may change external state.
    fn is_mutating(&self, _params: &Map<String, Value>) -> bool {
        self.kind().is_mutating()
    }

    /// Build a confirmation request for mutating invocations.
    fn confirmation(&self, invocation: &ToolInvocation) -> Option<ToolConfirmation> {
        if !self.is_mutating(&invocation.params) {
            return None;
        }
        Some(ToolConfirmation {
            tool_name: self.name().to_string(),
            params: invocation.params.clone(),
            description: format!("Execute {}", self.name()),
        })
    }

    /// Execute the tool. Expected failures should come back as
    /// `Ok(ToolResult::error(..))`; `Err` is reserved for faults.
    async fn execute(&self, invocation: ToolInvocation) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema().parameters(),
        }
    }
}
