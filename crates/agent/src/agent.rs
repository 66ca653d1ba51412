//! The turn orchestrator.

use relay_core::event::{AgentEvent, StreamEvent};
use relay_core::message::{Conversation, ToolResultMessage};
use relay_core::registry::ToolRegistry;
use relay_core::tool::ToolCall;
use relay_providers::ChatClient;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Owns the chat client, the tools, and one conversation.
///
/// One `Agent` serves one conversation; `run` takes `&mut self`, so turns
/// never overlap.
pub struct Agent {
    client: ChatClient,
    registry: ToolRegistry,
    conversation: Conversation,
    cwd: PathBuf,
    streaming: bool,
}

/// Everything one turn emitted, plus its final response.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub events: Vec<AgentEvent>,
    pub response: Option<String>,
}

impl Agent {
    pub fn new(client: ChatClient, registry: ToolRegistry, cwd: impl Into<PathBuf>) -> Self {
        Self {
            client,
            registry,
            conversation: Conversation::new(),
            cwd: cwd.into(),
            streaming: true,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation = self.conversation.with_system_prompt(prompt);
        self
    }

    /// Request whole completions instead of streamed deltas.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run one turn, writing its events to `events`.
    ///
    /// Returns the final assistant text, if the turn produced any. A dropped
    /// receiver does not stop the turn; the conversation is always left
    /// consistent.
    pub async fn run(
        &mut self,
        message: impl Into<String>,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Option<String> {
        let message = message.into();
        info!(
            conversation_id = %self.conversation.id,
            model = %self.client.model(),
            "Starting turn"
        );

        emit(
            events,
            AgentEvent::AgentStart {
                message: message.clone(),
            },
        )
        .await;
        self.conversation.add_user_message(message);

        let (text, tool_calls) = self.stream_response(events).await;

        let response = (!text.is_empty()).then_some(text);
        self.conversation
            .add_assistant_message_with_tool_calls(response.clone(), tool_calls.clone());
        if let Some(content) = &response {
            emit(
                events,
                AgentEvent::TextComplete {
                    content: content.clone(),
                },
            )
            .await;
        }

        let results = self.dispatch(tool_calls, events).await;
        for result in results {
            self.conversation.add_tool_result(result);
        }

        info!(
            conversation_id = %self.conversation.id,
            messages = self.conversation.len(),
            has_response = response.is_some(),
            "Turn finished"
        );
        emit(
            events,
            AgentEvent::AgentEnd {
                response: response.clone(),
            },
        )
        .await;

        response
    }

    /// Run one turn and gather its events.
    pub async fn run_collect(&mut self, message: impl Into<String>) -> TurnOutcome {
        let (tx, rx) = mpsc::channel(relay_providers::client::DEFAULT_EVENT_BUFFER);

        let turn = async {
            let response = self.run(message, &tx).await;
            drop(tx);
            response
        };
        let (response, events) = tokio::join!(turn, ReceiverStream::new(rx).collect::<Vec<_>>());

        TurnOutcome { events, response }
    }

    /// Drain one model response, forwarding deltas and errors.
    async fn stream_response(&self, events: &mpsc::Sender<AgentEvent>) -> (String, Vec<ToolCall>) {
        let tools = if self.registry.is_empty() {
            None
        } else {
            Some(self.registry.get_schemas())
        };

        let rx = self
            .client
            .chat_completion(self.conversation.get_messages(), tools, self.streaming);
        let mut stream = ReceiverStream::new(rx);

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::TextDelta { content } => {
                    text.push_str(&content);
                    emit(events, AgentEvent::TextDelta { content }).await;
                }
                StreamEvent::ToolCallComplete { call } => {
                    debug!(call_id = %call.call_id, tool = %call.name, "Model issued tool call");
                    tool_calls.push(call);
                }
                StreamEvent::MessageComplete {
                    finish_reason,
                    usage,
                    text: full_text,
                } => {
                    debug!(?finish_reason, ?usage, "Model response complete");
                    if let Some(full_text) = full_text
                        && text.is_empty()
                    {
                        text = full_text;
                    }
                }
                StreamEvent::Error { message } => {
                    warn!(error = %message, "Model stream reported an error");
                    emit(
                        events,
                        AgentEvent::AgentError {
                            error: message,
                            details: Map::new(),
                        },
                    )
                    .await;
                }
            }
        }

        (text, tool_calls)
    }

    /// Execute tool calls one after another, in the order the model issued them.
    async fn dispatch(
        &self,
        tool_calls: Vec<ToolCall>,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Vec<ToolResultMessage> {
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            emit(
                events,
                AgentEvent::ToolCallStart {
                    call_id: call.call_id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            )
            .await;

            let result = self
                .registry
                .invoke(&call.name, Some(Value::Object(call.arguments)), &self.cwd)
                .await;
            debug!(
                call_id = %call.call_id,
                tool = %call.name,
                success = result.success,
                "Tool call finished"
            );

            results.push(ToolResultMessage {
                call_id: call.call_id.clone(),
                content: result.to_model_output(),
                is_error: !result.success,
            });

            emit(
                events,
                AgentEvent::ToolCallComplete {
                    call_id: call.call_id,
                    name: call.name,
                    result,
                },
            )
            .await;
        }

        results
    }
}

async fn emit(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) {
    let event_type = event.event_type();
    if events.send(event).await.is_err() {
        debug!(event_type, "Agent event receiver dropped");
    }
}
