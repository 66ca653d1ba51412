//! End-to-end turn tests against a scripted chat transport.

use async_trait::async_trait;
use relay_agent::Agent;
use relay_core::error::{ProviderError, ToolError};
use relay_core::event::AgentEvent;
use relay_core::message::{Message, Role};
use relay_core::provider::{ChatChunk, ChatCompletion, ChatRequest, ChatTransport, ChunkReceiver};
use relay_core::registry::ToolRegistry;
use relay_core::schema::{ParamField, ParamSchema, ToolSchema};
use relay_core::tool::{Tool, ToolInvocation, ToolKind, ToolResult};
use relay_providers::{ChatClient, RetryPolicy};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// --- Scripted transport ---

struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Vec<Value>, ProviderError>>>,
    completions: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Result<Vec<Value>, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            completions: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers whole-completion requests, in order.
    fn completions(completions: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            completions: Mutex::new(completions.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request.to_body());
        let chunks = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left")?;

        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            let chunk: ChatChunk = serde_json::from_value(chunk).unwrap();
            tx.try_send(Ok(chunk)).unwrap();
        }
        Ok(rx)
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ProviderError> {
        self.requests.lock().unwrap().push(request.to_body());
        let completion = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::InvalidResponse("streaming only".into()))?;
        Ok(serde_json::from_value(completion).unwrap())
    }
}

fn text(content: &str) -> Value {
    json!({"choices": [{"delta": {"content": content}}]})
}

fn tool_call(index: u32, id: &str, name: &str, arguments: Value) -> Value {
    json!({"choices": [{"delta": {"tool_calls": [{
        "index": index,
        "id": id,
        "function": {"name": name, "arguments": arguments.to_string()}
    }]}}]})
}

fn finish(reason: &str) -> Value {
    json!({"choices": [{"delta": {}, "finish_reason": reason}]})
}

// --- Test tools ---

struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }
    fn description(&self) -> &str {
        "List files in a directory"
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }
    fn schema(&self) -> ToolSchema {
        ToolSchema::Params(ParamSchema::new().field(ParamField::string("path", "Directory")))
    }
    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let dir = invocation
            .params
            .get("path")
            .and_then(Value::as_str)
            .map(|p| invocation.cwd.join(p))
            .unwrap_or_else(|| invocation.cwd.clone());

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(ToolResult::success(names.join("\n")))
    }
}

/// Sleeps, then reports its own name.
struct DelayTool {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl Tool for DelayTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Waits, then answers"
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }
    fn schema(&self) -> ToolSchema {
        ToolSchema::Params(ParamSchema::new())
    }
    async fn execute(&self, _invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolResult::success(format!("{} done", self.name)))
    }
}

fn agent(transport: Arc<ScriptedTransport>, registry: ToolRegistry, cwd: &std::path::Path) -> Agent {
    let client = ChatClient::new(transport, "test-model")
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    Agent::new(client, registry, cwd)
}

fn event_types(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(AgentEvent::event_type).collect()
}

#[tokio::test]
async fn list_files_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    std::fs::write(dir.path().join("b.rs"), "b").unwrap();

    let transport = ScriptedTransport::new(vec![Ok(vec![
        text("Let me look."),
        tool_call(0, "call_1", "list_files", json!({"path": "."})),
        finish("tool_calls"),
    ])]);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListFilesTool));
    let mut agent = agent(transport.clone(), registry, dir.path());

    let outcome = agent.run_collect("list files").await;

    assert_eq!(
        event_types(&outcome.events),
        vec![
            "agent_start",
            "text_delta",
            "text_complete",
            "tool_call_start",
            "tool_call_complete",
            "agent_end",
        ]
    );
    assert_eq!(outcome.response.as_deref(), Some("Let me look."));

    match &outcome.events[4] {
        AgentEvent::ToolCallComplete { call_id, name, result } => {
            assert_eq!(call_id, "call_1");
            assert_eq!(name, "list_files");
            assert!(result.success);
            assert_eq!(result.output, "a.txt\nb.rs");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        outcome.events.last(),
        Some(&AgentEvent::AgentEnd {
            response: Some("Let me look.".into())
        })
    );

    let roles: Vec<Role> = agent.conversation().messages().iter().map(Message::role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);

    match &agent.conversation().messages()[2] {
        Message::ToolResult(result) => {
            assert_eq!(result.call_id, "call_1");
            assert_eq!(result.content, "a.txt\nb.rs");
            assert!(!result.is_error);
        }
        other => panic!("unexpected {other:?}"),
    }

    let request = &transport.requests()[0];
    assert_eq!(request["tools"][0]["function"]["name"], "list_files");
    assert_eq!(request["tool_choice"], "auto");
    assert_eq!(request["messages"][0]["role"], "user");
}

#[tokio::test]
async fn deltas_concatenate_to_text_complete_and_stored_message() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![Ok(vec![
        text("The "),
        text("answer "),
        text("is 42."),
        finish("stop"),
    ])]);
    let mut agent = agent(transport.clone(), ToolRegistry::new(), dir.path());

    let outcome = agent.run_collect("what is the answer?").await;

    let streamed: String = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::TextDelta { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    let completes: Vec<&AgentEvent> = outcome
        .events
        .iter()
        .filter(|e| matches!(e, AgentEvent::TextComplete { .. }))
        .collect();

    assert_eq!(streamed, "The answer is 42.");
    assert_eq!(
        completes,
        vec![&AgentEvent::TextComplete {
            content: "The answer is 42.".into()
        }]
    );
    match &agent.conversation().messages()[1] {
        Message::Assistant { content, tool_calls } => {
            assert_eq!(content.as_deref(), Some("The answer is 42."));
            assert!(tool_calls.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }

    // Empty registry: no tools field at all
    let request = &transport.requests()[0];
    assert!(request.get("tools").is_none());
    assert!(request.get("tool_choice").is_none());
}

#[tokio::test]
async fn non_streaming_turn_emits_one_text_complete() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::completions(vec![json!({
        "choices": [{"message": {"content": "Full answer."}, "finish_reason": "stop"}]
    })]);
    let mut agent = agent(transport.clone(), ToolRegistry::new(), dir.path()).with_streaming(false);

    let outcome = agent.run_collect("answer in one go").await;

    assert_eq!(
        event_types(&outcome.events),
        vec!["agent_start", "text_complete", "agent_end"]
    );
    assert_eq!(
        outcome.events[1],
        AgentEvent::TextComplete {
            content: "Full answer.".into()
        }
    );
    assert_eq!(outcome.response.as_deref(), Some("Full answer."));
    match &agent.conversation().messages()[1] {
        Message::Assistant { content, tool_calls } => {
            assert_eq!(content.as_deref(), Some("Full answer."));
            assert!(tool_calls.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }

    let request = &transport.requests()[0];
    assert_eq!(request["stream"], false);
}

#[tokio::test(start_paused = true)]
async fn slow_first_tool_keeps_call_order() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![Ok(vec![
        tool_call(0, "call_slow", "slow", json!({})),
        tool_call(1, "call_fast", "fast", json!({})),
        finish("tool_calls"),
    ])]);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DelayTool {
        name: "slow",
        delay: Duration::from_secs(5),
    }));
    registry.register(Box::new(DelayTool {
        name: "fast",
        delay: Duration::ZERO,
    }));
    let mut agent = agent(transport, registry, dir.path());

    let outcome = agent.run_collect("go").await;

    let starts: Vec<&str> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCallStart { call_id, .. } => Some(call_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(starts, vec!["call_slow", "call_fast"]);
    assert_eq!(
        event_types(&outcome.events),
        vec![
            "agent_start",
            "tool_call_start",
            "tool_call_complete",
            "tool_call_start",
            "tool_call_complete",
            "agent_end",
        ]
    );
    assert_eq!(outcome.response, None);

    let messages = agent.conversation().messages();
    match &messages[1] {
        Message::Assistant { content, tool_calls } => {
            assert!(content.is_none());
            assert_eq!(tool_calls.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    let result_ids: Vec<&str> = messages[2..]
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult(r) => Some(r.call_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(result_ids, vec!["call_slow", "call_fast"]);
}

#[tokio::test]
async fn tool_failures_become_error_results() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![Ok(vec![
        tool_call(0, "call_1", "does_not_exist", json!({})),
        tool_call(1, "call_2", "list_files", json!({"path": 7})),
        finish("tool_calls"),
    ])]);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListFilesTool));
    let mut agent = agent(transport, registry, dir.path());

    let outcome = agent.run_collect("break things").await;

    let results: Vec<&ToolResult> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ToolCallComplete { result, .. } => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].error.as_deref(), Some("Unknown tool: does_not_exist"));
    assert_eq!(
        results[1].error.as_deref(),
        Some("Invalid parameters for tool list_files: Parameter 'path': Input should be a valid string")
    );

    let stored: Vec<(bool, String)> = agent
        .conversation()
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult(r) => Some((r.is_error, r.content.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        stored,
        vec![
            (true, "Error: Unknown tool: does_not_exist".to_string()),
            (
                true,
                "Error: Invalid parameters for tool list_files: Parameter 'path': Input should be a valid string"
                    .to_string()
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stream_error_surfaces_as_agent_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![Err(ProviderError::AuthenticationFailed(
        "bad key".into(),
    ))]);
    let mut agent = agent(transport, ToolRegistry::new(), dir.path());

    let outcome = agent.run_collect("hello").await;

    assert_eq!(
        event_types(&outcome.events),
        vec!["agent_start", "agent_error", "agent_end"]
    );
    match &outcome.events[1] {
        AgentEvent::AgentError { error, details } => {
            assert!(error.contains("bad key"));
            assert!(details.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(outcome.response, None);

    // The turn is still recorded, with a placeholder assistant message
    let roles: Vec<Role> = agent.conversation().messages().iter().map(Message::role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_retried_transparently() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(vec![
        Err(ProviderError::RateLimited("slow down".into())),
        Ok(vec![text("ok"), finish("stop")]),
    ]);
    let mut agent = agent(transport.clone(), ToolRegistry::new(), dir.path());

    let outcome = agent.run_collect("hi").await;

    assert_eq!(
        event_types(&outcome.events),
        vec!["agent_start", "text_delta", "text_complete", "agent_end"]
    );
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn second_turn_sends_tool_results_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("only.txt"), "x").unwrap();

    let transport = ScriptedTransport::new(vec![
        Ok(vec![
            tool_call(0, "call_1", "list_files", json!({})),
            finish("tool_calls"),
        ]),
        Ok(vec![text("There is one file."), finish("stop")]),
    ]);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListFilesTool));
    let mut agent = agent(transport.clone(), registry, dir.path()).with_system_prompt("Be brief.");

    agent.run_collect("list files").await;
    let outcome = agent.run_collect("and?").await;
    assert_eq!(outcome.response.as_deref(), Some("There is one file."));

    let second = &transport.requests()[1];
    let roles: Vec<&str> = second["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "tool", "user"]);
    assert_eq!(second["messages"][2]["tool_calls"][0]["id"], "call_1");
    assert_eq!(second["messages"][3]["tool_call_id"], "call_1");
    assert_eq!(second["messages"][3]["content"], "only.txt");
}
