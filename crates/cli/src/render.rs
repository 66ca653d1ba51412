//! Plain-text rendering of agent events.

use relay_core::event::AgentEvent;
use relay_core::tool::ToolResult;
use serde_json::{Map, Value};
use std::io::{self, Write};

/// Longest tool output preview shown on stderr.
const PREVIEW_CHARS: usize = 200;

/// Writes assistant text to `out` and everything else to `err`.
pub struct Renderer<O: Write, E: Write> {
    out: O,
    err: E,
    mid_line: bool,
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            mid_line: false,
        }
    }

    pub fn render(&mut self, event: &AgentEvent) -> io::Result<()> {
        match event {
            AgentEvent::AgentStart { .. } | AgentEvent::AgentEnd { .. } => {}
            AgentEvent::TextDelta { content } => {
                write!(self.out, "{content}")?;
                self.out.flush()?;
                self.mid_line = !content.ends_with('\n');
            }
            AgentEvent::TextComplete { .. } => self.end_line()?,
            AgentEvent::ToolCallStart {
                name, arguments, ..
            } => {
                self.end_line()?;
                writeln!(self.err, "-> {name}({})", format_arguments(arguments))?;
            }
            AgentEvent::ToolCallComplete { name, result, .. } => {
                writeln!(self.err, "{}", format_result(name, result))?;
            }
            AgentEvent::AgentError { error, .. } => {
                self.end_line()?;
                writeln!(self.err, "Agent Error: {error}")?;
            }
        }
        Ok(())
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.out.flush()?;
            self.mid_line = false;
        }
        Ok(())
    }
}

fn format_arguments(arguments: &Map<String, Value>) -> String {
    arguments
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}={s:?}"),
            other => format!("{k}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_result(name: &str, result: &ToolResult) -> String {
    if !result.success {
        return format!(
            "x {name}: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    let lines = result.output.lines().count();
    let mut preview: String = result.output.chars().take(PREVIEW_CHARS).collect();
    if preview.len() < result.output.len() {
        preview.push_str("...");
    }
    let truncated = if result.truncated { ", truncated" } else { "" };
    format!("ok {name} ({lines} lines{truncated})\n{preview}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_all(events: &[AgentEvent]) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut renderer = Renderer::new(&mut out, &mut err);
            for event in events {
                renderer.render(event).unwrap();
            }
        }
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn text_goes_to_stdout() {
        let (out, err) = render_all(&[
            AgentEvent::AgentStart {
                message: "hi".into(),
            },
            AgentEvent::TextDelta {
                content: "Hel".into(),
            },
            AgentEvent::TextDelta {
                content: "lo".into(),
            },
            AgentEvent::TextComplete {
                content: "Hello".into(),
            },
            AgentEvent::AgentEnd {
                response: Some("Hello".into()),
            },
        ]);
        assert_eq!(out, "Hello\n");
        assert!(err.is_empty());
    }

    #[test]
    fn tools_and_errors_go_to_stderr() {
        let args = json!({"path": "a.txt", "limit": 2});
        let (out, err) = render_all(&[
            AgentEvent::ToolCallStart {
                call_id: "c1".into(),
                name: "read_file".into(),
                arguments: args.as_object().cloned().unwrap(),
            },
            AgentEvent::ToolCallComplete {
                call_id: "c1".into(),
                name: "read_file".into(),
                result: ToolResult::error("File not found: a.txt"),
            },
            AgentEvent::AgentError {
                error: "API error: boom".into(),
                details: Map::new(),
            },
        ]);
        assert!(out.is_empty());
        assert!(err.contains("-> read_file("));
        assert!(err.contains("path=\"a.txt\""));
        assert!(err.contains("x read_file: File not found: a.txt"));
        assert!(err.contains("Agent Error: API error: boom"));
    }

    #[test]
    fn long_output_is_previewed() {
        let result = ToolResult::success("y".repeat(500)).with_truncated(true);
        let line = format_result("read_file", &result);
        assert!(line.starts_with("ok read_file (1 lines, truncated)\n"));
        assert!(line.ends_with("..."));
    }
}
