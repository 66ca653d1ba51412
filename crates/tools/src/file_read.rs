//! File read tool: line-numbered text windows with size and token limits.

use crate::paths::{is_binary_file, resolve_path};
use crate::text::{estimate_tokens, split_lines, truncate_to_tokens};
use async_trait::async_trait;
use relay_core::error::ToolError;
use relay_core::schema::{ParamField, ParamSchema, ToolSchema};
use relay_core::tool::{Tool, ToolInvocation, ToolKind, ToolResult};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::debug;

const MIB: u64 = 1024 * 1024;

pub struct ReadFileTool {
    /// Files above this size are refused.
    pub max_file_size_bytes: u64,
    /// Output budget before truncation kicks in.
    pub max_output_tokens: usize,
}

impl ReadFileTool {
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * MIB;
    pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 25_000;

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_MAX_FILE_SIZE, Self::DEFAULT_MAX_OUTPUT_TOKENS)
    }

    pub fn with_limits(max_file_size_bytes: u64, max_output_tokens: usize) -> Self {
        Self {
            max_file_size_bytes,
            max_output_tokens,
        }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file. Returns the file content with line numbers. \
         For large files, use offset and limit to read specific portions. \
         Cannot read binary files (images, executables, etc.)."
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Read
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::Params(
            ParamSchema::new()
                .field(
                    ParamField::string(
                        "path",
                        "Path to the file to read (relative to the working directory or absolute)",
                    )
                    .required(),
                )
                .field(
                    ParamField::integer(
                        "offset",
                        "Line number to start reading from (1-based). Default is 1.",
                    )
                    .min(1)
                    .with_default(json!(1)),
                )
                .field(
                    ParamField::integer(
                        "limit",
                        "Maximum number of lines to read. Reads to the end of the file if omitted.",
                    )
                    .min(1),
                ),
        )
    }

    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolResult, ToolError> {
        let raw_path = invocation
            .params
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let offset = count_param(&invocation.params, "offset")?.unwrap_or(1);
        let limit = count_param(&invocation.params, "limit")?;

        let path = resolve_path(&invocation.cwd, raw_path).await;
        let display = path.display().to_string();

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolResult::error(format!("File not found: {display}")));
            }
            Err(e) => return Ok(ToolResult::error(format!("Failed to read file: {e}"))),
        };

        if !meta.is_file() {
            return Ok(ToolResult::error(format!("Path is not a file: {display}")));
        }

        let size = meta.len();
        if size > self.max_file_size_bytes {
            return Ok(ToolResult::error(format!(
                "File too large ({:.1}MB). Maximum is {:.0}MB.",
                size as f64 / MIB as f64,
                self.max_file_size_bytes as f64 / MIB as f64
            )));
        }

        if is_binary_file(&path).await {
            return Ok(ToolResult::error(format!(
                "Cannot read binary file: {} ({}) This tool only reads text files.",
                file_name(&path),
                human_size(size)
            )));
        }

        let content = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_text(bytes),
            Err(e) => return Ok(ToolResult::error(format!("Failed to read file: {e}"))),
        };

        let lines = split_lines(&content);
        let total_lines = lines.len();

        if total_lines == 0 {
            return Ok(ToolResult::success(format!("File is empty: {display}"))
                .with_metadata("lines_read", 0));
        }

        let start_idx = offset - 1;
        let end_idx = match limit {
            Some(limit) => start_idx.saturating_add(limit).min(total_lines),
            None => total_lines,
        };
        let window = lines.get(start_idx..end_idx).unwrap_or(&[]);

        let mut output = window
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:6}|{}", start_idx + i + 1, line))
            .collect::<Vec<_>>()
            .join("\n");

        let truncated = estimate_tokens(&output) > self.max_output_tokens;
        if truncated {
            let display_path = display.as_str();
            debug!(path = display_path, total_lines, "Truncating read_file output");
            output = truncate_to_tokens(
                &output,
                self.max_output_tokens,
                &format!("\n... [truncated {total_lines} total number of lines] "),
            );
        }

        if start_idx > 0 || end_idx < total_lines {
            output = format!(
                "Showing lines {}-{} of {}.\n\n{}",
                start_idx + 1,
                end_idx,
                total_lines,
                output
            );
        }

        Ok(ToolResult::success(output)
            .with_truncated(truncated)
            .with_metadata("path", display)
            .with_metadata("total_lines", total_lines)
            .with_metadata("shown_start", start_idx + 1)
            .with_metadata("shown_end", end_idx))
    }
}

/// A positive integer parameter; whole floats like `2.0` are accepted.
fn count_param(params: &Map<String, Value>, key: &str) -> Result<Option<usize>, ToolError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 1.0)
                    .map(|f| f as u64)
            })
            .filter(|n| *n >= 1)
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("'{key}' must be a positive integer"))
            }),
    }
}

/// UTF-8, falling back to Latin-1 (every byte maps to one char).
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn human_size(size: u64) -> String {
    if size >= MIB {
        format!("{:.2}MB", size as f64 / MIB as f64)
    } else {
        format!("{size} bytes")
    }
}
