//! Name-keyed tool registry and the dispatch boundary.
//!
//! The agent loop uses this to:
//! 1. Get tool definitions to send to the LLM
//! 2. Validate and execute tool calls the LLM requests
//!
//! [`ToolRegistry::invoke`] is total: unknown tools, invalid arguments,
//! execution errors and panics all come back as an error [`ToolResult`].

use futures::FutureExt;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::provider::ToolDefinition;
use crate::tool::{Tool, ToolInvocation, ToolResult};

/// A registry of available tools, ordered by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Overwriting existing tool");
        }
        debug!(tool = %name, kind = %tool.kind(), "Registered tool");
        self.tools.insert(name, tool);
    }

    /// Remove a tool. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All registered tools.
    pub fn get_tools(&self) -> Vec<&dyn Tool> {
        self.tools.values().map(|t| t.as_ref()).collect()
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn get_schemas(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute a tool call.
    pub async fn invoke(&self, name: &str, params: Option<Value>, cwd: &Path) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolResult::error(format!("Unknown tool: {name}")).with_metadata("tool_name", name);
        };

        let params = match params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                let errors = vec!["Parameters must be a JSON object".to_string()];
                return validation_failure(name, errors);
            }
        };

        let errors = tool.validate(&params);
        if !errors.is_empty() {
            debug!(tool = %name, count = errors.len(), "Tool parameters failed validation");
            return validation_failure(name, errors);
        }

        let invocation = ToolInvocation {
            params,
            cwd: cwd.to_path_buf(),
        };

        match AssertUnwindSafe(tool.execute(invocation)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(tool = %name, error = %e, "Error executing tool");
                ToolResult::error(format!("Internal Error executing tool {name}: {e}"))
                    .with_metadata("tool_name", name)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(tool = %name, reason = %reason, "Tool panicked");
                ToolResult::error(format!("Internal Error executing tool {name}: {reason}"))
                    .with_metadata("tool_name", name)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validation_failure(name: &str, errors: Vec<String>) -> ToolResult {
    ToolResult::error(format!(
        "Invalid parameters for tool {name}: {}",
        errors.join("; ")
    ))
    .with_metadata("tool_name", name)
    .with_metadata("validation_errors", json!(errors))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
