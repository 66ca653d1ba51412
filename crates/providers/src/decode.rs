//! Turns parsed response chunks into [`StreamEvent`]s.

use relay_core::error::ProviderError;
use relay_core::event::{StreamEvent, TokenUsage};
use relay_core::message::WireToolCall;
use relay_core::provider::{ChatChunk, ChatCompletion, ToolCallDelta};
use relay_core::tool::ToolCall;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Per-response decoding state for a streamed completion.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one chunk, returning the text delta it carries, if any.
    pub fn push(&mut self, chunk: ChatChunk) -> Option<StreamEvent> {
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.into());
        }

        let choice = chunk.choices.into_iter().next()?;

        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(reason);
        }

        for delta in choice.delta.tool_calls.unwrap_or_default() {
            self.absorb_tool_call(delta);
        }

        choice
            .delta
            .content
            .filter(|c| !c.is_empty())
            .map(StreamEvent::text_delta)
    }

    /// Events that close a normally finished stream: every fully assembled
    /// tool call in index order, then exactly one `MessageComplete`.
    pub fn finish(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .tool_calls
            .into_values()
            .filter_map(ToolCallAccumulator::complete)
            .map(|call| StreamEvent::ToolCallComplete { call })
            .collect();

        events.push(StreamEvent::MessageComplete {
            finish_reason: self.finish_reason,
            usage: self.usage,
            text: None,
        });
        events
    }

    fn absorb_tool_call(&mut self, delta: ToolCallDelta) {
        let acc = self.tool_calls.entry(delta.index).or_default();
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            acc.id = id;
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                acc.name = name;
            }
            if let Some(args) = function.arguments {
                acc.arguments.push_str(&args);
            }
        }
    }
}

/// Accumulates incremental tool call deltas into a complete tool call.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn complete(self) -> Option<ToolCall> {
        if self.id.is_empty() || self.name.is_empty() {
            warn!(id = %self.id, name = %self.name, "Dropping tool call without id or name");
            return None;
        }
        match parse_arguments(&self.arguments) {
            Some(arguments) => Some(ToolCall {
                call_id: self.id,
                name: self.name,
                arguments,
            }),
            None => {
                warn!(
                    call_id = %self.id,
                    tool = %self.name,
                    arguments = %self.arguments,
                    "Dropping tool call with malformed arguments"
                );
                None
            }
        }
    }
}

/// Arguments must decode to a JSON object; blank means no arguments.
fn parse_arguments(raw: &str) -> Option<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Some(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Decode a non-streaming completion: tool calls (if any), then a single
/// `MessageComplete` carrying the full text.
pub fn decode_completion(completion: ChatCompletion) -> Result<Vec<StreamEvent>, ProviderError> {
    let usage = completion.usage.map(TokenUsage::from);
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

    let mut events: Vec<StreamEvent> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(wire_to_call)
        .map(|call| StreamEvent::ToolCallComplete { call })
        .collect();

    events.push(StreamEvent::MessageComplete {
        finish_reason: choice.finish_reason,
        usage,
        text: choice.message.content.filter(|c| !c.is_empty()),
    });
    Ok(events)
}

fn wire_to_call(call: WireToolCall) -> Option<ToolCall> {
    ToolCallAccumulator {
        id: call.id,
        name: call.function.name,
        arguments: call.function.arguments,
    }
    .complete()
}
